use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query},
    http::StatusCode,
    Extension, Json,
};
use image_storage::UploadFile;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    gallery::{DeleteOutcome, GalleryController, UserDecision, ViewState},
    types::AppError,
};

/// Files split by whether they were handed to the uploader
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Names of the files accepted for upload
    pub accepted: Vec<String>,
    /// Names of the files rejected because they are not images
    pub rejected: Vec<String>,
    /// View state right after the files were handed to the controller
    pub state: ViewState,
}

/// Path parameters of the delete route
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImagePath {
    /// Object key of the image
    pub key: String,
}

/// Query parameters of the delete route
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DeleteQuery {
    /// Whether the user confirmed the deletion
    #[serde(default)]
    pub confirmed: bool,
}

/// What a delete request did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStatus {
    /// The image was removed
    Deleted,
    /// The user did not confirm
    Cancelled,
    /// Storage reported a failure
    Failed,
}

/// Result of a delete request together with the resulting view state
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// What happened to the image
    pub outcome: DeleteStatus,
    /// View state after the request
    pub state: ViewState,
}

/// Current state of the gallery page
#[allow(clippy::unused_async)]
pub async fn get_state(
    Extension(controller): Extension<Arc<GalleryController>>,
) -> Json<ViewState> {
    Json(controller.snapshot())
}

/// Reloads the image list from storage
#[instrument(skip(controller))]
pub async fn refresh(
    Extension(controller): Extension<Arc<GalleryController>>,
) -> Json<ViewState> {
    controller.refresh().await;
    Json(controller.snapshot())
}

/// Accepts picked or dropped files for upload
///
/// Every file part of the multipart form is one selected file. Image files
/// are uploaded in the background; poll the gallery state for progress.
/// Non-image files are rejected without any storage call.
///
/// # Errors
///
/// Returns `AppError` if the multipart body cannot be read
#[instrument(skip(controller, multipart))]
pub async fn upload_files(
    Extension(controller): Extension<Arc<GalleryController>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(ToString::to_string) else {
            // Plain form fields carry no file
            continue;
        };
        let content_type = field
            .content_type()
            .map_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string(), ToString::to_string);
        let bytes = field.bytes().await?;

        files.push(UploadFile::new(name, content_type, bytes));
    }

    tracing::info!("Received {} files", files.len());

    let (accepted, rejected): (Vec<_>, Vec<_>) = files.iter().partition(|f| f.is_image());
    let accepted = accepted.into_iter().map(|f| f.name.clone()).collect();
    let rejected = rejected.into_iter().map(|f| f.name.clone()).collect();

    // Uploads outlive the request; completion is observed through the state
    drop(controller.select_files(files));

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            accepted,
            rejected,
            state: controller.snapshot(),
        }),
    ))
}

/// Deletes an image if the user confirmed it
///
/// Responds 200 when the image was deleted or the user declined, and 502
/// when storage reported a failure. The status message in the returned state
/// describes the result.
#[instrument(skip(controller))]
pub async fn delete_image(
    Extension(controller): Extension<Arc<GalleryController>>,
    Path(ImagePath { key }): Path<ImagePath>,
    Query(query): Query<DeleteQuery>,
) -> (StatusCode, Json<DeleteResponse>) {
    let outcome = controller
        .delete_image(&key, &UserDecision(query.confirmed))
        .await;

    let (status, outcome) = match outcome {
        DeleteOutcome::Deleted => (StatusCode::OK, DeleteStatus::Deleted),
        DeleteOutcome::Cancelled => (StatusCode::OK, DeleteStatus::Cancelled),
        DeleteOutcome::Failed(_) => (StatusCode::BAD_GATEWAY, DeleteStatus::Failed),
    };

    (
        status,
        Json(DeleteResponse {
            outcome,
            state: controller.snapshot(),
        }),
    )
}
