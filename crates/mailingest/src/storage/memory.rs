use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::StorageError;

use super::{validate_key, ObjectMetadata, ObjectStore, Tag};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    metadata: ObjectMetadata,
    tags: Vec<Tag>,
    /// Remaining `exists` calls that report the object as absent.
    hidden_polls: u32,
}

/// Counts of mutating calls, for asserting side effects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OperationCounts {
    pub puts: usize,
    pub copies: usize,
    pub tag_writes: usize,
}

/// In-process object store.
///
/// `with_visibility_lag(n)` makes every newly written object invisible to the
/// next `n` calls to [`ObjectStore::exists`], which mimics a backend with
/// read-after-write lag.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    visibility_lag: u32,
    puts: AtomicUsize,
    copies: AtomicUsize,
    tag_writes: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility_lag(mut self, polls: u32) -> Self {
        self.visibility_lag = polls;
        self
    }

    pub fn counts(&self) -> OperationCounts {
        OperationCounts {
            puts: self.puts.load(Ordering::SeqCst),
            copies: self.copies.load(Ordering::SeqCst),
            tag_writes: self.tag_writes.load(Ordering::SeqCst),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        // A panic while holding the lock cannot leave a half-applied write,
        // every mutation is a single map operation.
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn not_found(bucket: &str, key: &str) -> StorageError {
        StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    fn insert(&self, bucket: &str, key: &str, body: Vec<u8>, metadata: ObjectMetadata) {
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                metadata,
                tags: Vec::new(),
                hidden_polls: self.visibility_lag,
            },
        );
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        self.insert(bucket, key, body.to_vec(), metadata.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<(), StorageError> {
        validate_key(dest_key)?;
        let source = self
            .lock()
            .get(&(bucket.to_string(), source_key.to_string()))
            .cloned()
            .ok_or_else(|| Self::not_found(bucket, source_key))?;
        self.insert(bucket, dest_key, source.body, source.metadata);
        self.copies.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn put_tags(&self, bucket: &str, key: &str, tags: &[Tag]) -> Result<(), StorageError> {
        let mut objects = self.lock();
        let object = objects
            .get_mut(&(bucket.to_string(), key.to_string()))
            .ok_or_else(|| Self::not_found(bucket, key))?;
        object.tags = tags.to_vec();
        self.tag_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn tags(&self, bucket: &str, key: &str) -> Result<Vec<Tag>, StorageError> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.tags.clone())
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StorageError> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.metadata.clone())
            .ok_or_else(|| Self::not_found(bucket, key))
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let mut objects = self.lock();
        match objects.get_mut(&(bucket.to_string(), key.to_string())) {
            Some(object) if object.hidden_polls > 0 => {
                object.hidden_polls -= 1;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}
