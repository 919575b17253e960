/// Gallery state, uploads and deletes
pub mod gallery;

use aide::axum::{
    routing::{delete, get, post},
    ApiRouter,
};

/// Creates the v1 API router with all v1 handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/v1/gallery", get(gallery::get_state))
        .api_route("/v1/gallery/refresh", post(gallery::refresh))
        .api_route("/v1/gallery/uploads", post(gallery::upload_files))
        .api_route("/v1/gallery/images/{key}", delete(gallery::delete_image))
}
