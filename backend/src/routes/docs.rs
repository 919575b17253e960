use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar, transform::TransformOpenApi};
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Extension, Json};

use crate::types::Environment;

/// Routes serving the API reference and the raw OpenAPI document
pub fn handler() -> ApiRouter {
    let scalar = Scalar::new("/openapi.json").with_title("Image Gallery Docs");

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route("/openapi.json", get(openapi_schema))
}

/// Top-level metadata of the generated OpenAPI document
pub fn describe_api(api: TransformOpenApi<'_>) -> TransformOpenApi<'_> {
    api.title("Image Gallery")
        .description("Upload, list and delete images stored in an S3 bucket")
}

#[allow(clippy::unused_async)]
async fn openapi_schema(
    Extension(environment): Extension<Environment>,
    Extension(openapi): Extension<OpenApi>,
) -> impl IntoResponse {
    if !environment.show_api_docs() {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(openapi).into_response()
}
