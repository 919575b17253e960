use aide::axum::ApiRouter;
use axum::{response::Html, routing::get};

const INDEX_HTML: &str = include_str!("ui/index.html");

/// Serves the gallery page; it renders `/v1/gallery` and forwards user
/// actions to the v1 routes
pub fn handler() -> ApiRouter {
    ApiRouter::new().route("/", get(index))
}

#[allow(clippy::unused_async)]
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
