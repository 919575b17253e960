//! Environment configuration for different deployment stages

use std::env;

use aws_config::{retry::RetryConfig, BehaviorVersion, Region};
use image_storage::StorageConfig;
use tracing::Level;

use crate::gallery::UploadPolicy;

/// Region used when `AWS_REGION` is not set
pub const DEFAULT_AWS_REGION: &str = "ap-northeast-2";

/// Request body limit for uploads when `MAX_UPLOAD_BYTES` is not set
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the S3 bucket name for the environment
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set outside development
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development => {
                env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "image-gallery".to_string())
            }
        }
    }

    /// AWS region of the bucket, also used to build public URLs
    #[must_use]
    pub fn aws_region(&self) -> String {
        env::var("AWS_REGION")
            .ok()
            .filter(|region| !region.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string())
    }

    /// Whether uploads request the `public-read` canned ACL
    #[must_use]
    pub fn public_read_acl(&self) -> bool {
        env::var("S3_PUBLIC_READ_ACL")
            .ok()
            .and_then(|val| val.trim().parse::<bool>().ok())
            .unwrap_or(true)
    }

    /// How overlapping uploads share the progress state
    ///
    /// # Panics
    ///
    /// Panics if `UPLOAD_POLICY` contains an invalid value
    #[must_use]
    pub fn upload_policy(&self) -> UploadPolicy {
        env::var("UPLOAD_POLICY").map_or(UploadPolicy::Serialized, |val| {
            val.trim()
                .to_lowercase()
                .parse()
                .unwrap_or_else(|_| panic!("Invalid upload policy: {val}"))
        })
    }

    /// Maximum accepted request body size for uploads
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Bucket coordinates handed to the storage gateway
    #[must_use]
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            bucket: self.s3_bucket(),
            region: self.aws_region(),
            public_read: self.public_read_acl(),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration
    ///
    /// Storage calls are plain request/response: SDK retries are disabled
    /// and no operation timeout is set.
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let mut config_builder = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.aws_region()))
            .retry_config(RetryConfig::disabled());

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.load().await
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // Override "force path style" to true for compatibility with LocalStack
        // https://github.com/awslabs/aws-sdk-rust/discussions/874
        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    /// Default log level, overridable with `TRACING_LEVEL`
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}
