//! In-memory object store for tests

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{ObjectStoreClient, ObjectSummary, PutObject, StorageError, StorageResult};

/// Operations of [`ObjectStoreClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `put_object`
    Put,
    /// `list_objects`
    List,
    /// `object_exists`
    Head,
    /// `delete_object`
    Delete,
}

/// An object held by [`InMemoryObjectStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object contents
    pub bytes: Bytes,
    /// Declared MIME type
    pub content_type: String,
    /// Whether `public-read` was requested
    pub public_read: bool,
    /// Time the object was stored
    pub last_modified: DateTime<Utc>,
}

/// [`ObjectStoreClient`] that keeps objects in memory
///
/// Objects are listed in key order, like S3. Deleting a missing key
/// succeeds, like S3. Every call is counted, and any operation can be made
/// to fail with a fixed message.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failures: Mutex<HashMap<Operation, String>>,
    put_calls: AtomicUsize,
    list_calls: AtomicUsize,
    head_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryObjectStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object without counting a put
    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Bytes>, content_type: &str) {
        lock(&self.objects).insert(
            key.into(),
            StoredObject {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
                public_read: false,
                last_modified: Utc::now(),
            },
        );
    }

    /// Makes every subsequent call of `operation` fail with `message`
    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        lock(&self.failures).insert(operation, message.into());
    }

    /// Clears an injected failure
    pub fn recover(&self, operation: Operation) {
        lock(&self.failures).remove(&operation);
    }

    /// Returns a stored object
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        lock(&self.objects).get(key).cloned()
    }

    /// Keys currently stored, in order
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Number of calls made for `operation`
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.counter(operation).load(Ordering::SeqCst)
    }

    const fn counter(&self, operation: Operation) -> &AtomicUsize {
        match operation {
            Operation::Put => &self.put_calls,
            Operation::List => &self.list_calls,
            Operation::Head => &self.head_calls,
            Operation::Delete => &self.delete_calls,
        }
    }

    fn record(&self, operation: Operation) -> StorageResult<()> {
        self.counter(operation).fetch_add(1, Ordering::SeqCst);
        match lock(&self.failures).get(&operation) {
            Some(message) => Err(StorageError::Service(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryObjectStore {
    async fn put_object(&self, request: PutObject) -> StorageResult<()> {
        self.record(Operation::Put)?;

        // Draining the body drives any progress listener attached to it
        let bytes = request
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Body(e.to_string()))?
            .into_bytes();

        lock(&self.objects).insert(
            request.key,
            StoredObject {
                bytes,
                content_type: request.content_type,
                public_read: request.public_read,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list_objects(&self, _bucket: &str, max_keys: i32) -> StorageResult<Vec<ObjectSummary>> {
        self.record(Operation::List)?;

        let limit = usize::try_from(max_keys).unwrap_or_default();
        Ok(lock(&self.objects)
            .iter()
            .take(limit)
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                last_modified: object.last_modified,
                size: object.bytes.len() as u64,
            })
            .collect())
    }

    async fn object_exists(&self, _bucket: &str, key: &str) -> StorageResult<bool> {
        self.record(Operation::Head)?;
        Ok(lock(&self.objects).contains_key(key))
    }

    async fn delete_object(&self, _bucket: &str, key: &str) -> StorageResult<()> {
        self.record(Operation::Delete)?;
        lock(&self.objects).remove(key);
        Ok(())
    }
}
