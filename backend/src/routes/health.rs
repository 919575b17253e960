use std::sync::Arc;

use aide::axum::IntoApiResponse;
use axum::{Extension, Json};
use schemars::JsonSchema;
use serde::Serialize;

use crate::gallery::GalleryController;

/// Service status and storage target
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    /// Current version of the application
    semver: String,
    /// Commit hash of the current build (if available)
    rev: Option<String>,
    /// Bucket images are stored in
    bucket: String,
    /// Region of the bucket
    region: String,
    /// How overlapping uploads are handled
    upload_policy: String,
}

/// Health check endpoint
///
/// Returns the current status, version and storage target of the service.
/// Does not contact storage.
#[allow(clippy::unused_async)]
pub async fn handler(
    Extension(controller): Extension<Arc<GalleryController>>,
) -> impl IntoApiResponse {
    let storage = controller.storage_config();

    Json(HealthResponse {
        status: "ok".to_string(),
        semver: env!("CARGO_PKG_VERSION").to_string(),
        rev: option_env!("GIT_REV").map(ToString::to_string),
        bucket: storage.bucket.clone(),
        region: storage.region.clone(),
        upload_policy: controller.policy().to_string(),
    })
}
