//! Object store transport and its S3 implementation

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::{
    error::SdkError, operation::head_object::HeadObjectError, primitives::ByteStream,
    types::ObjectCannedAcl, Client as S3Client,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{StorageError, StorageResult};

/// A single put request
#[derive(Debug)]
pub struct PutObject {
    /// Target bucket
    pub bucket: String,
    /// Object key
    pub key: String,
    /// Declared MIME type of the body
    pub content_type: String,
    /// Exact body length in bytes
    pub content_length: i64,
    /// Request the `public-read` canned ACL
    pub public_read: bool,
    /// Streaming body
    pub body: ByteStream,
}

/// One entry of an object listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Object key
    pub key: String,
    /// Last modification time
    pub last_modified: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Low-level object store operations used by [`crate::ImageStorage`]
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Stores an object, resolving once the service acknowledges it
    async fn put_object(&self, request: PutObject) -> StorageResult<()>;

    /// Lists at most `max_keys` objects of the bucket
    async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<Vec<ObjectSummary>>;

    /// Checks whether an object exists
    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Deletes an object
    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()>;
}

/// [`ObjectStoreClient`] backed by the AWS S3 SDK
pub struct S3ObjectStore {
    s3_client: Arc<S3Client>,
}

impl S3ObjectStore {
    /// Creates a new S3 transport
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>) -> Self {
        Self { s3_client }
    }
}

#[async_trait]
impl ObjectStoreClient for S3ObjectStore {
    async fn put_object(&self, request: PutObject) -> StorageResult<()> {
        let mut put = self
            .s3_client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .content_type(request.content_type)
            .content_length(request.content_length)
            .body(request.body);

        if request.public_read {
            put = put.acl(ObjectCannedAcl::PublicRead);
        }

        put.send().await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, max_keys: i32) -> StorageResult<Vec<ObjectSummary>> {
        let output = self
            .s3_client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(max_keys)
            .send()
            .await?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let last_modified = object
                    .last_modified()
                    .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()))
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
                let size = object
                    .size()
                    .and_then(|size| u64::try_from(size).ok())
                    .unwrap_or_default();

                Some(ObjectSummary {
                    key,
                    last_modified,
                    size,
                })
            })
            .collect();

        Ok(objects)
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let result = self
            .s3_client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
            {
                debug!("Object does not exist: {key}");
                Ok(false)
            }
            Err(SdkError::ServiceError(service_err))
                if service_err.raw().status().as_u16() >= 500 =>
            {
                Err(StorageError::Upstream(format!(
                    "Storage service unavailable (HTTP {})",
                    service_err.raw().status().as_u16()
                )))
            }
            Err(e) => Err(StorageError::from(e)),
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }
}

/// Interprets a HEAD response: `NotFound` means the object is absent
#[cfg(test)]
fn exists_from_head<T>(result: Result<T, SdkError<HeadObjectError>>, key: &str) -> StorageResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(SdkError::ServiceError(service_err))
            if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
        {
            debug!("Object does not exist: {key}");
            Ok(false)
        }
        Err(e) => Err(StorageError::from(e)),
    }
}
