//! S3-based image storage for the gallery
//!
//! [`ImageStorage`] is the only entry point the rest of the service uses. It
//! names uploaded objects, synthesizes their public URLs and converts every
//! transport failure into a [`StorageError`].

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

mod client;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod progress;

use std::sync::Arc;

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub use client::{ObjectStoreClient, ObjectSummary, PutObject, S3ObjectStore};
pub use error::{StorageError, StorageResult};
pub use progress::{ProgressBody, ProgressListener, ProgressTracker, PROGRESS_CHUNK_SIZE};

/// Maximum number of objects returned by a listing
pub const LIST_MAX_KEYS: usize = 100;

/// Bucket coordinates used to address and publish objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// S3 bucket name
    pub bucket: String,
    /// AWS region of the bucket
    pub region: String,
    /// Request the `public-read` canned ACL for uploads
    pub public_read: bool,
}

/// A file selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name
    pub name: String,
    /// Declared MIME type
    pub content_type: String,
    /// File contents
    pub bytes: Bytes,
}

impl UploadFile {
    /// Creates a new upload file
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether the declared MIME type is an image type
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// An image stored in the bucket, as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    /// Object key
    pub key: String,
    /// Publicly fetchable URL
    pub url: String,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Assigned object key
    pub key: String,
    /// Public URL of the object
    pub url: String,
    /// Name the file is stored under, i.e. the object key
    pub file_name: String,
}

/// Uniform success/failure report of one upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    /// Whether the upload was acknowledged by the service
    pub success: bool,
    /// Public URL, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Assigned object key, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Stored file name (the object key), on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Failure message, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<StorageResult<UploadedImage>> for UploadOutcome {
    fn from(result: StorageResult<UploadedImage>) -> Self {
        match result {
            Ok(uploaded) => Self {
                success: true,
                url: Some(uploaded.url),
                key: Some(uploaded.key),
                file_name: Some(uploaded.file_name),
                error: None,
            },
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

impl UploadOutcome {
    /// A failed outcome carrying `message`
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            key: None,
            file_name: None,
            error: Some(message.into()),
        }
    }
}

/// Public URL of an object in a public-read bucket
#[must_use]
pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
}

/// Object key for a file uploaded at `timestamp_millis`
#[must_use]
pub fn object_key(timestamp_millis: i64, file_name: &str) -> String {
    format!("{timestamp_millis}-{file_name}")
}

/// Image storage gateway
pub struct ImageStorage {
    client: Arc<dyn ObjectStoreClient>,
    config: StorageConfig,
}

impl ImageStorage {
    /// Creates a new image storage gateway
    ///
    /// # Arguments
    ///
    /// * `client` - Transport used for every remote call
    /// * `config` - Bucket, region and ACL settings
    #[must_use]
    pub fn new(client: Arc<dyn ObjectStoreClient>, config: StorageConfig) -> Self {
        Self { client, config }
    }

    /// Storage configuration
    #[must_use]
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Public URL of `key` in the configured bucket
    #[must_use]
    pub fn url_for(&self, key: &str) -> String {
        object_url(&self.config.bucket, &self.config.region, key)
    }

    /// Uploads a file under a timestamped key
    ///
    /// `progress` receives strictly increasing percentages while the body is
    /// sent. The call resolves only after the service acknowledges the put.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the transport or the service fails
    pub async fn upload(
        &self,
        file: &UploadFile,
        progress: Arc<dyn ProgressListener>,
    ) -> StorageResult<UploadedImage> {
        let key = object_key(Utc::now().timestamp_millis(), &file.name);
        let content_length = i64::try_from(file.bytes.len())
            .map_err(|_| StorageError::Body(format!("{} is too large", file.name)))?;

        debug!(
            "Uploading {} as {} ({} bytes, {})",
            file.name, key, content_length, file.content_type
        );

        let body = ProgressBody::new(file.bytes.clone(), progress);
        let request = PutObject {
            bucket: self.config.bucket.clone(),
            key: key.clone(),
            content_type: file.content_type.clone(),
            content_length,
            public_read: self.config.public_read,
            body: ByteStream::from_body_1_x(body),
        };

        self.client.put_object(request).await.inspect_err(|e| {
            error!("Failed to upload {}: {}", key, e);
        })?;

        info!("Uploaded {}", key);

        Ok(UploadedImage {
            url: self.url_for(&key),
            file_name: key.clone(),
            key,
        })
    }

    /// Lists up to [`LIST_MAX_KEYS`] stored images
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails
    pub async fn list(&self) -> StorageResult<Vec<StoredImage>> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let max_keys = LIST_MAX_KEYS as i32;

        let objects = self
            .client
            .list_objects(&self.config.bucket, max_keys)
            .await
            .inspect_err(|e| error!("Failed to list {}: {}", self.config.bucket, e))?;

        let images: Vec<StoredImage> = objects
            .into_iter()
            .take(LIST_MAX_KEYS)
            .map(|object| StoredImage {
                url: self.url_for(&object.key),
                key: object.key,
                last_modified: object.last_modified,
                size: object.size,
            })
            .collect();

        debug!("Listed {} images", images.len());
        Ok(images)
    }

    /// Deletes an image
    ///
    /// A key that does not exist is reported as `StorageError::NotFound`
    /// rather than silently succeeding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key does not exist, or another
    /// `StorageError` if the service fails
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let exists = self
            .client
            .object_exists(&self.config.bucket, key)
            .await
            .inspect_err(|e| error!("Failed to check {}: {}", key, e))?;

        if !exists {
            return Err(StorageError::NotFound(key.to_string()));
        }

        self.client
            .delete_object(&self.config.bucket, key)
            .await
            .inspect_err(|e| error!("Failed to delete {}: {}", key, e))?;

        info!("Deleted {}", key);
        Ok(())
    }
}
