//! Error types for image storage operations

use std::error::Error as StdError;

use aws_sdk_s3::{
    config::http::HttpResponse,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::{
        delete_object::DeleteObjectError, head_object::HeadObjectError,
        list_objects_v2::ListObjectsV2Error, put_object::PutObjectError,
    },
};
use thiserror::Error;

/// Result type for image storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during image storage operations
///
/// The display text of every variant is meant to be shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Error reported by the storage service, message passed through verbatim
    #[error("{0}")]
    Service(String),

    /// The storage service answered with a 5xx status
    #[error("{0}")]
    Upstream(String),

    /// The request never produced a service response (dispatch, IO, timeout)
    #[error("{0}")]
    Transport(String),

    /// The object does not exist in the bucket
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The upload body could not be read
    #[error("Failed to read upload body: {0}")]
    Body(String),
}

impl StorageError {
    /// Maps an SDK failure to a storage error
    ///
    /// Service responses keep the message the service sent, falling back to
    /// its error code and then to the full error context. 5xx responses
    /// become [`StorageError::Upstream`].
    fn from_sdk<E>(error: &SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + StdError + 'static,
    {
        match error {
            SdkError::ServiceError(service_err) => {
                let status = service_err.raw().status().as_u16();
                let message = error.message().or_else(|| error.code());

                if status >= 500 {
                    return Self::Upstream(message.map_or_else(
                        || format!("Storage service unavailable (HTTP {status})"),
                        ToString::to_string,
                    ));
                }

                Self::Service(
                    message.map_or_else(|| DisplayErrorContext(error).to_string(), ToString::to_string),
                )
            }
            _ => Self::Transport(DisplayErrorContext(error).to_string()),
        }
    }
}

impl From<SdkError<PutObjectError>> for StorageError {
    fn from(error: SdkError<PutObjectError>) -> Self {
        Self::from_sdk(&error)
    }
}

impl From<SdkError<ListObjectsV2Error>> for StorageError {
    fn from(error: SdkError<ListObjectsV2Error>) -> Self {
        Self::from_sdk(&error)
    }
}

impl From<SdkError<DeleteObjectError>> for StorageError {
    fn from(error: SdkError<DeleteObjectError>) -> Self {
        Self::from_sdk(&error)
    }
}

impl From<SdkError<HeadObjectError>> for StorageError {
    fn from(error: SdkError<HeadObjectError>) -> Self {
        Self::from_sdk(&error)
    }
}
