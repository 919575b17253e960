mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backend::gallery::{
    DeleteOutcome, GalleryController, MessageLevel, UploadPolicy, UserDecision,
    IMAGES_ONLY_MESSAGE, IMAGE_DELETED_MESSAGE, UPLOAD_COMPLETE_MESSAGE,
};
use common::*;
use image_storage::{
    mock::{InMemoryObjectStore, Operation},
    ImageStorage, ObjectStoreClient, ObjectSummary, PutObject, StorageResult, UploadFile,
};
use pretty_assertions::assert_eq;

fn controller_with(store: Arc<InMemoryObjectStore>, policy: UploadPolicy) -> Arc<GalleryController> {
    setup_test_env();
    let storage = Arc::new(ImageStorage::new(store, test_storage_config()));
    Arc::new(GalleryController::new(storage, policy))
}

fn controller(store: &Arc<InMemoryObjectStore>) -> Arc<GalleryController> {
    controller_with(store.clone(), UploadPolicy::Serialized)
}

fn jpeg(name: &str) -> UploadFile {
    UploadFile::new(name, "image/jpeg", jpeg_bytes())
}

#[tokio::test]
async fn test_initial_state_is_loading() {
    let store = Arc::new(InMemoryObjectStore::new());
    let state = controller(&store).snapshot();

    assert!(state.loading);
    assert!(!state.uploading);
    assert_eq!(state.upload_progress, 0);
    assert!(state.images.is_empty());
    assert_eq!(state.message, "");
    assert_eq!(state.message_level, None);
}

#[tokio::test]
async fn test_refresh_loads_images() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("1700000000000-a.png", vec![1, 2, 3], "image/png");
    store.insert("1700000000001-b.png", vec![4, 5], "image/png");
    let controller = controller(&store);

    controller.refresh().await;

    let state = controller.snapshot();
    assert!(!state.loading);
    let keys: Vec<_> = state.images.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["1700000000000-a.png", "1700000000001-b.png"]);
    assert_eq!(
        state.images[0].url,
        format!("https://{TEST_BUCKET}.s3.{TEST_REGION}.amazonaws.com/1700000000000-a.png")
    );
    assert_eq!(state.images[1].size, 2);
}

#[tokio::test]
async fn test_refresh_failure_keeps_previous_list() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("1700000000000-a.png", vec![1], "image/png");
    let controller = controller(&store);
    controller.refresh().await;

    store.insert("1700000000001-b.png", vec![2], "image/png");
    store.fail(Operation::List, "Access Denied");
    controller.refresh().await;

    let state = controller.snapshot();
    assert!(!state.loading);
    assert_eq!(state.images.len(), 1);
    assert_eq!(state.message, "Failed to load images: Access Denied");
    assert_eq!(state.message_level, Some(MessageLevel::Error));
}

#[tokio::test]
async fn test_upload_cat_jpg() {
    let store = Arc::new(InMemoryObjectStore::new());
    let controller = controller(&store);
    controller.refresh().await;

    let handles = controller.select_files(vec![jpeg("cat.jpg")]);
    assert_eq!(handles.len(), 1);

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }
    let outcome = &outcomes[0];

    assert!(outcome.success);
    let key = outcome.key.clone().unwrap();
    assert_eq!(outcome.file_name.as_deref(), Some(key.as_str()));
    let (timestamp, name) = key.split_once('-').unwrap();
    assert!(timestamp.parse::<i64>().is_ok());
    assert_eq!(name, "cat.jpg");
    assert_eq!(
        outcome.url.as_deref(),
        Some(format!("https://{TEST_BUCKET}.s3.{TEST_REGION}.amazonaws.com/{key}").as_str())
    );

    let stored = store.get(&key).unwrap();
    assert_eq!(stored.content_type, "image/jpeg");
    assert_eq!(stored.bytes.len(), jpeg_bytes().len());
    assert!(stored.public_read);

    // One listing on load and exactly one after the upload
    assert_eq!(store.calls(Operation::List), 2);

    let state = controller.snapshot();
    assert_eq!(state.message, UPLOAD_COMPLETE_MESSAGE);
    assert_eq!(state.message_level, Some(MessageLevel::Success));
    assert!(!state.uploading);
    assert_eq!(state.upload_progress, 0);
    assert!(state.images.iter().any(|image| image.key == key));
}

#[tokio::test]
async fn test_non_image_is_rejected() {
    let store = Arc::new(InMemoryObjectStore::new());
    let controller = controller(&store);

    let handles = controller.select_files(vec![UploadFile::new(
        "report.pdf",
        "application/pdf",
        b"%PDF-1.7".to_vec(),
    )]);

    assert!(handles.is_empty());
    assert_eq!(store.calls(Operation::Put), 0);
    assert_eq!(store.calls(Operation::List), 0);

    let state = controller.snapshot();
    assert_eq!(state.message, IMAGES_ONLY_MESSAGE);
    assert_eq!(state.message_level, Some(MessageLevel::Error));
    assert!(!state.uploading);
}

#[tokio::test]
async fn test_mixed_selection_uploads_only_images() {
    let store = Arc::new(InMemoryObjectStore::new());
    let controller = controller(&store);

    let handles = controller.select_files(vec![
        UploadFile::new("report.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
        jpeg("cat.jpg"),
    ]);
    assert_eq!(handles.len(), 1);
    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    assert_eq!(store.calls(Operation::Put), 1);
    assert_eq!(store.keys().len(), 1);
    assert_eq!(controller.snapshot().message, UPLOAD_COMPLETE_MESSAGE);
}

#[tokio::test]
async fn test_upload_failure_does_not_refresh() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.fail(Operation::Put, "Access Denied");
    let controller = controller(&store);

    let outcome = controller.upload_file(jpeg("cat.jpg")).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("Access Denied"));
    assert_eq!(outcome.key, None);
    assert_eq!(store.calls(Operation::List), 0);
    assert!(store.keys().is_empty());

    let state = controller.snapshot();
    assert_eq!(state.message, "Upload failed: Access Denied");
    assert_eq!(state.message_level, Some(MessageLevel::Error));
    assert!(!state.uploading);
    assert_eq!(state.upload_progress, 0);
    assert_eq!(state.pending_uploads, 0);
}

#[tokio::test]
async fn test_upload_clears_previous_message() {
    let store = Arc::new(InMemoryObjectStore::new());
    let controller = controller(&store);
    controller.select_files(vec![UploadFile::new("notes.txt", "text/plain", b"hi".to_vec())]);
    assert_eq!(controller.snapshot().message, IMAGES_ONLY_MESSAGE);

    store.fail(Operation::Put, "Access Denied");
    controller.upload_file(jpeg("cat.jpg")).await;

    assert_eq!(controller.snapshot().message, "Upload failed: Access Denied");
}

#[tokio::test]
async fn test_delete_confirmed() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("1700000000000-cat.jpg", jpeg_bytes(), "image/jpeg");
    let controller = controller(&store);
    controller.refresh().await;
    assert_eq!(controller.snapshot().images.len(), 1);

    let outcome = controller
        .delete_image("1700000000000-cat.jpg", &UserDecision(true))
        .await;

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(store.calls(Operation::Head), 1);
    assert_eq!(store.calls(Operation::Delete), 1);
    assert_eq!(store.calls(Operation::List), 2);
    assert!(store.keys().is_empty());

    let state = controller.snapshot();
    assert_eq!(state.message, IMAGE_DELETED_MESSAGE);
    assert_eq!(state.message_level, Some(MessageLevel::Success));
    assert!(state.images.is_empty());
}

#[tokio::test]
async fn test_delete_cancelled() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("1700000000000-cat.jpg", jpeg_bytes(), "image/jpeg");
    let controller = controller(&store);
    controller.refresh().await;

    let outcome = controller
        .delete_image("1700000000000-cat.jpg", &UserDecision(false))
        .await;

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(store.calls(Operation::Head), 0);
    assert_eq!(store.calls(Operation::Delete), 0);
    assert_eq!(store.calls(Operation::List), 1);
    assert_eq!(store.keys(), vec!["1700000000000-cat.jpg".to_string()]);
    assert_eq!(controller.snapshot().message, "");
}

#[tokio::test]
async fn test_delete_missing_key_fails() {
    let store = Arc::new(InMemoryObjectStore::new());
    let controller = controller(&store);
    controller.refresh().await;

    let outcome = controller
        .delete_image("missing.jpg", &UserDecision(true))
        .await;

    assert_eq!(
        outcome,
        DeleteOutcome::Failed("Delete failed: Object not found: missing.jpg".to_string())
    );
    assert_eq!(store.calls(Operation::Delete), 0);
    assert_eq!(store.calls(Operation::List), 1);

    let state = controller.snapshot();
    assert_eq!(state.message, "Delete failed: Object not found: missing.jpg");
    assert_eq!(state.message_level, Some(MessageLevel::Error));
}

#[tokio::test]
async fn test_delete_service_failure() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert("1700000000000-cat.jpg", jpeg_bytes(), "image/jpeg");
    store.fail(Operation::Delete, "Access Denied");
    let controller = controller(&store);
    controller.refresh().await;

    let outcome = controller
        .delete_image("1700000000000-cat.jpg", &UserDecision(true))
        .await;

    assert_eq!(
        outcome,
        DeleteOutcome::Failed("Delete failed: Access Denied".to_string())
    );
    assert_eq!(store.calls(Operation::List), 1);
    assert_eq!(controller.snapshot().images.len(), 1);
}

/// Object store that holds every put for a moment and records how many
/// puts overlapped
#[derive(Default)]
struct SlowStore {
    inner: InMemoryObjectStore,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ObjectStoreClient for SlowStore {
    async fn put_object(&self, request: PutObject) -> StorageResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = self.inner.put_object(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<Vec<ObjectSummary>> {
        self.inner.list_objects(bucket, max_keys).await
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.inner.object_exists(bucket, key).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.inner.delete_object(bucket, key).await
    }
}

async fn upload_two_with(policy: UploadPolicy) -> Arc<SlowStore> {
    setup_test_env();
    let store = Arc::new(SlowStore::default());
    let storage = Arc::new(ImageStorage::new(store.clone(), test_storage_config()));
    let controller = Arc::new(GalleryController::new(storage, policy));

    let handles = controller.select_files(vec![jpeg("a.jpg"), jpeg("b.jpg")]);
    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    let state = controller.snapshot();
    assert!(!state.uploading);
    assert_eq!(state.upload_progress, 0);
    assert_eq!(store.inner.keys().len(), 2);
    assert_eq!(store.inner.calls(Operation::List), 2);
    store
}

#[tokio::test]
async fn test_serialized_policy_runs_one_upload_at_a_time() {
    let store = upload_two_with(UploadPolicy::Serialized).await;
    assert_eq!(store.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_policy_overlaps_uploads() {
    let store = upload_two_with(UploadPolicy::Concurrent).await;
    assert_eq!(store.peak.load(Ordering::SeqCst), 2);
}

/// Object store that captures the controller's view state right after the
/// body of a put has been sent
#[derive(Default)]
struct SnapshotStore {
    inner: InMemoryObjectStore,
    controller: std::sync::OnceLock<Arc<GalleryController>>,
    seen: std::sync::Mutex<Vec<backend::gallery::ViewState>>,
}

#[async_trait]
impl ObjectStoreClient for SnapshotStore {
    async fn put_object(&self, request: PutObject) -> StorageResult<()> {
        let result = self.inner.put_object(request).await;
        if let Some(controller) = self.controller.get() {
            self.seen.lock().unwrap().push(controller.snapshot());
        }
        result
    }

    async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<Vec<ObjectSummary>> {
        self.inner.list_objects(bucket, max_keys).await
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.inner.object_exists(bucket, key).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.inner.delete_object(bucket, key).await
    }
}

#[tokio::test]
async fn test_progress_is_visible_while_uploading() {
    setup_test_env();
    let store = Arc::new(SnapshotStore::default());
    let storage = Arc::new(ImageStorage::new(store.clone(), test_storage_config()));
    let controller = Arc::new(GalleryController::new(storage, UploadPolicy::Serialized));
    assert!(store.controller.set(controller.clone()).is_ok());

    let outcome = controller.upload_file(jpeg("cat.jpg")).await;
    assert!(outcome.success);

    let seen = store.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].uploading);
    assert_eq!(seen[0].upload_progress, 100);
    assert_eq!(seen[0].message, "");
    assert_eq!(seen[0].pending_uploads, 1);

    let state = controller.snapshot();
    assert!(!state.uploading);
    assert_eq!(state.upload_progress, 0);
}

#[tokio::test]
async fn test_queued_uploads_are_counted_until_done() {
    setup_test_env();
    let store = Arc::new(SnapshotStore::default());
    let storage = Arc::new(ImageStorage::new(store.clone(), test_storage_config()));
    let controller = Arc::new(GalleryController::new(storage, UploadPolicy::Serialized));
    assert!(store.controller.set(controller.clone()).is_ok());

    let handles = controller.select_files(vec![jpeg("a.jpg"), jpeg("b.jpg")]);
    assert_eq!(controller.snapshot().pending_uploads, 2);

    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    let seen = store.seen.lock().unwrap().clone();
    let pending: Vec<_> = seen.iter().map(|s| s.pending_uploads).collect();
    assert_eq!(pending, vec![2, 1]);
    assert_eq!(controller.snapshot().pending_uploads, 0);
}

#[tokio::test]
async fn test_queued_uploads_never_look_idle() {
    setup_test_env();
    let store = Arc::new(SlowStore::default());
    let storage = Arc::new(ImageStorage::new(store.clone(), test_storage_config()));
    let controller = Arc::new(GalleryController::new(storage, UploadPolicy::Serialized));
    controller.refresh().await;

    let files = (0..5).map(|i| jpeg(&format!("{i}.jpg"))).collect();
    let handles = controller.select_files(files);

    let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let observer = {
        let controller = controller.clone();
        let store = store.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let mut observed = 0;
            while !done.load(Ordering::SeqCst) {
                let state = controller.snapshot();
                let stored = store.inner.keys().len();
                let idle = !state.uploading && !state.loading && state.pending_uploads == 0;
                assert!(!idle || stored == 5, "idle with {stored} of 5 uploads stored");
                observed += 1;
                tokio::task::yield_now().await;
            }
            observed
        })
    };

    for handle in handles {
        assert!(handle.await.unwrap().success);
    }
    done.store(true, Ordering::SeqCst);

    assert!(observer.await.unwrap() > 0);
    assert_eq!(controller.snapshot().pending_uploads, 0);
}
