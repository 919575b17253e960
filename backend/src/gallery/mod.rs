//! Upload and gallery controller
//!
//! Owns the [`ViewState`] of the gallery page and turns user actions into
//! storage gateway calls. The state is only mutated when an operation starts
//! or completes, and on upload progress ticks.

mod confirmation;
mod policy;
mod state;

use std::sync::{Arc, PoisonError, RwLock};

use image_storage::{ImageStorage, ProgressListener, StorageConfig, UploadFile, UploadOutcome};
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{debug, error, info, instrument, warn};

pub use confirmation::{DeleteConfirmation, UserDecision};
pub use policy::UploadPolicy;
pub use state::{
    MessageLevel, ViewState, IMAGES_ONLY_MESSAGE, IMAGE_DELETED_MESSAGE, UPLOAD_COMPLETE_MESSAGE,
};

/// Result of a delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined; nothing happened
    Cancelled,
    /// The image was deleted and the list refreshed
    Deleted,
    /// The gateway reported a failure
    Failed(String),
}

/// View state shared with progress callbacks
#[derive(Clone, Default)]
struct SharedState(Arc<RwLock<ViewState>>);

impl SharedState {
    fn read(&self) -> ViewState {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update(&self, f: impl FnOnce(&mut ViewState)) {
        let mut state = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }
}

/// Controller behind the gallery page
pub struct GalleryController {
    storage: Arc<ImageStorage>,
    state: SharedState,
    policy: UploadPolicy,
    upload_slot: Semaphore,
}

impl GalleryController {
    /// Creates a controller in the initial loading state
    #[must_use]
    pub fn new(storage: Arc<ImageStorage>, policy: UploadPolicy) -> Self {
        Self {
            storage,
            state: SharedState::default(),
            policy,
            upload_slot: Semaphore::new(1),
        }
    }

    /// Upload policy in effect
    #[must_use]
    pub const fn policy(&self) -> UploadPolicy {
        self.policy
    }

    /// Bucket coordinates of the underlying storage
    #[must_use]
    pub fn storage_config(&self) -> &StorageConfig {
        self.storage.config()
    }

    /// Copy of the current view state
    #[must_use]
    pub fn snapshot(&self) -> ViewState {
        self.state.read()
    }

    /// Reloads the image list
    ///
    /// The previous list is replaced on success and kept on failure.
    /// `loading` is cleared in both cases.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        self.state.update(|s| s.loading = true);

        match self.storage.list().await {
            Ok(images) => {
                info!("Loaded {} images", images.len());
                self.state.update(|s| {
                    s.images = images;
                    s.loading = false;
                });
            }
            Err(e) => {
                error!("Failed to load images: {}", e);
                self.state.update(|s| {
                    s.set_message(format!("Failed to load images: {e}"));
                    s.loading = false;
                });
            }
        }
    }

    /// Handles files picked or dropped by the user
    ///
    /// Files whose MIME type is not an image type are rejected on the spot
    /// with [`IMAGES_ONLY_MESSAGE`]. Every other file is counted in
    /// `pending_uploads` before this returns and is uploaded by its own
    /// task; the returned handles resolve to the per-file outcome.
    pub fn select_files(self: &Arc<Self>, files: Vec<UploadFile>) -> Vec<JoinHandle<UploadOutcome>> {
        debug!("{} files selected", files.len());

        files
            .into_iter()
            .filter_map(|file| {
                if !file.is_image() {
                    warn!(
                        "Rejected non-image file {} ({})",
                        file.name, file.content_type
                    );
                    self.state.update(|s| s.set_message(IMAGES_ONLY_MESSAGE));
                    return None;
                }

                self.state.update(|s| s.pending_uploads += 1);
                let controller = Arc::clone(self);
                Some(tokio::spawn(async move { controller.run_upload(file).await }))
            })
            .collect()
    }

    /// Uploads one image file and refreshes the list on success
    pub async fn upload_file(&self, file: UploadFile) -> UploadOutcome {
        self.state.update(|s| s.pending_uploads += 1);
        self.run_upload(file).await
    }

    /// Uploads a file already counted in `pending_uploads` and releases
    /// its count once done
    #[instrument(skip(self, file), fields(file_name = %file.name, size = file.bytes.len()))]
    async fn run_upload(&self, file: UploadFile) -> UploadOutcome {
        let _slot = match self.policy {
            UploadPolicy::Serialized => match self.upload_slot.acquire().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    error!("Upload slot unavailable: {}", e);
                    self.state
                        .update(|s| s.pending_uploads = s.pending_uploads.saturating_sub(1));
                    return UploadOutcome::failure(e.to_string());
                }
            },
            UploadPolicy::Concurrent => None,
        };

        info!("Starting upload");
        self.state.update(|s| {
            s.uploading = true;
            s.upload_progress = 0;
            s.clear_message();
        });

        let state = self.state.clone();
        let progress: Arc<dyn ProgressListener> = Arc::new(move |percent: u8| {
            state.update(|s| s.upload_progress = percent);
        });

        let result = self.storage.upload(&file, progress).await;

        match &result {
            Ok(uploaded) => {
                info!("Upload succeeded: {}", uploaded.key);
                self.state.update(|s| s.set_message(UPLOAD_COMPLETE_MESSAGE));
                self.refresh().await;
            }
            Err(e) => {
                error!("Upload failed: {}", e);
                self.state
                    .update(|s| s.set_message(format!("Upload failed: {e}")));
            }
        }

        self.state.update(|s| {
            s.uploading = false;
            s.upload_progress = 0;
            s.pending_uploads = s.pending_uploads.saturating_sub(1);
        });

        result.into()
    }

    /// Deletes an image once the user confirms
    #[instrument(skip(self, confirmation))]
    pub async fn delete_image(
        &self,
        key: &str,
        confirmation: &dyn DeleteConfirmation,
    ) -> DeleteOutcome {
        if !confirmation.confirm(key).await {
            info!("Delete cancelled");
            return DeleteOutcome::Cancelled;
        }

        match self.storage.delete(key).await {
            Ok(()) => {
                info!("Delete succeeded");
                self.state.update(|s| s.set_message(IMAGE_DELETED_MESSAGE));
                self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(e) => {
                error!("Delete failed: {}", e);
                let message = format!("Delete failed: {e}");
                self.state.update(|s| s.set_message(message.clone()));
                DeleteOutcome::Failed(message)
            }
        }
    }
}
