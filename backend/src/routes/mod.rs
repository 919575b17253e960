mod docs;
mod health;
mod ui;
/// Versioned API routes
pub mod v1;

use aide::axum::{routing::get, ApiRouter};

pub use docs::describe_api;

/// Creates the router with all handler routes
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler())
        .merge(ui::handler())
        .api_route("/health", get(health::handler))
        .merge(v1::handler())
}
