use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use backend::{gallery::GalleryController, server, types::Environment};
use image_storage::{ImageStorage, S3ObjectStore};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON logs for staging/production, human readable logs for development
    let filter = EnvFilter::builder()
        .with_default_directive(environment.tracing_level().into())
        .from_env_lossy();
    match environment {
        Environment::Production | Environment::Staging => {
            fmt().json().with_env_filter(filter).init();
        }
        Environment::Development => {
            fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting Image Gallery in {:?} environment", environment);

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let storage = Arc::new(ImageStorage::new(
        Arc::new(S3ObjectStore::new(s3_client)),
        environment.storage_config(),
    ));

    info!(
        "✅ Initialized image storage for bucket {}",
        storage.config().bucket
    );

    let controller = Arc::new(GalleryController::new(
        storage,
        environment.upload_policy(),
    ));

    server::start(environment, controller).await
}
