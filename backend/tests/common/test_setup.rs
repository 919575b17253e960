use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Extension, Router};
use backend::{
    gallery::{GalleryController, UploadPolicy},
    routes,
    types::Environment,
};
use image_storage::{mock::InMemoryObjectStore, ImageStorage, StorageConfig};
use tower::ServiceExt;

use super::utils::{multipart_body, MULTIPART_BOUNDARY};

pub const TEST_BUCKET: &str = "test-bucket";
pub const TEST_REGION: &str = "ap-northeast-2";

/// Setup test environment variables with all the required configuration
pub fn setup_test_env() {
    // Load test environment variables
    dotenvy::from_path(".env.example").ok();

    // Initialize tracing for tests
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Storage configuration pointing at the test bucket
pub fn test_storage_config() -> StorageConfig {
    StorageConfig {
        bucket: TEST_BUCKET.to_string(),
        region: TEST_REGION.to_string(),
        public_read: true,
    }
}

/// Base test setup with an in-memory object store behind the real routes
pub struct TestSetup {
    pub router: Router,
    pub environment: Environment,
    pub store: Arc<InMemoryObjectStore>,
    pub controller: Arc<GalleryController>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_policy(UploadPolicy::Serialized)
    }

    pub fn with_policy(policy: UploadPolicy) -> Self {
        setup_test_env();

        let environment = Environment::Development;
        let store = Arc::new(InMemoryObjectStore::new());
        let storage = Arc::new(ImageStorage::new(store.clone(), test_storage_config()));
        let controller = Arc::new(GalleryController::new(storage, policy));

        let router = routes::handler()
            .layer(Extension(environment.clone()))
            .layer(Extension(controller.clone()))
            .into();

        Self {
            router,
            environment,
            store,
            controller,
        }
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_post_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    /// Posts `files` as `(file name, content type, contents)` form parts
    pub async fn send_multipart_request(
        &self,
        route: &str,
        files: &[(&str, &str, &[u8])],
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(multipart_body(files)))?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_delete_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("DELETE")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn parse_response_body(
        &self,
        response: Response,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        use http_body_util::BodyExt;

        let body = response.into_body().collect().await?.to_bytes();
        let json = serde_json::from_slice(&body)?;
        Ok(json)
    }

    /// Waits until no upload is in flight and `expected_lists` listings ran
    pub async fn wait_for_uploads(&self, expected_lists: usize) {
        use image_storage::mock::Operation;

        wait_until(|| {
            !self.controller.snapshot().uploading
                && self.store.calls(Operation::List) >= expected_lists
        })
        .await;
    }
}

/// Polls `condition` until it holds, panicking after two seconds
pub async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
