pub mod filesystem;
pub mod memory;
pub mod settle;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub use filesystem::FsObjectStore;
pub use memory::MemoryObjectStore;
pub use settle::{tag_when_visible, wait_until_visible, SettlePolicy};

/// User metadata attached to an object at write time.
pub type ObjectMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Bucket/key object storage as seen by the pipeline.
///
/// Implementations must be safe to share between invocations running on
/// different threads; all writes are keyed and never coordinate.
pub trait ObjectStore: Send + Sync {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError>;

    /// Server-side copy within one bucket. Metadata travels with the object.
    fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<(), StorageError>;

    /// Replaces the tag set of an existing object.
    fn put_tags(&self, bucket: &str, key: &str, tags: &[Tag]) -> Result<(), StorageError>;

    fn tags(&self, bucket: &str, key: &str) -> Result<Vec<Tag>, StorageError>;

    fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StorageError>;

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Keys under `prefix`, sorted.
    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Rejects keys that could escape their bucket once mapped onto a path.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(invalid("key is an absolute path"));
    }
    if key.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(invalid("key contains path traversal"));
    }
    if key.split('/').any(|segment| segment.is_empty()) {
        return Err(invalid("key contains an empty segment"));
    }
    Ok(())
}
