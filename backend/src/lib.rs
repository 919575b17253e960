//! Image gallery service backed by an S3 bucket

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Upload and gallery controller
pub mod gallery;

/// HTTP routes
pub mod routes;

/// HTTP server
pub mod server;

/// Configuration and error types
pub mod types;
