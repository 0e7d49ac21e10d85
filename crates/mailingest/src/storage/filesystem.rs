use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walk::collect_files;

use crate::error::StorageError;

use super::{validate_key, ObjectMetadata, ObjectStore, Tag};

/// Directory holding per-object metadata and tags, kept apart from object
/// bodies so listings only ever see data.
const SIDECAR_DIR: &str = ".objmeta";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    metadata: ObjectMetadata,
    #[serde(default)]
    tags: Vec<Tag>,
}

/// Object store backed by a local directory: `{root}/{bucket}/{key}`.
///
/// Metadata and tags live in `{root}/.objmeta/{bucket}/{key}.json`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(bucket)?;
        validate_key(key)?;
        if bucket == SIDECAR_DIR {
            return Err(StorageError::InvalidKey {
                key: bucket.to_string(),
                reason: "bucket name is reserved".to_string(),
            });
        }
        Ok(self.root.join(bucket).join(key))
    }

    fn sidecar_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self
            .root
            .join(SIDECAR_DIR)
            .join(bucket)
            .join(format!("{}.json", key)))
    }

    fn read_sidecar(&self, bucket: &str, key: &str) -> Result<Sidecar, StorageError> {
        let path = self.sidecar_path(bucket, key)?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StorageError::Sidecar { path, source: e })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(StorageError::ReadFile { path, source: e }),
        }
    }

    fn write_sidecar(&self, bucket: &str, key: &str, sidecar: &Sidecar) -> Result<(), StorageError> {
        let path = self.sidecar_path(bucket, key)?;
        let body = serde_json::to_vec_pretty(sidecar).map_err(|e| StorageError::Sidecar {
            path: path.clone(),
            source: e,
        })?;
        write_atomic(&path, &body)
    }

    fn require_object(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let path = self.object_path(bucket, key)?;
        if !path.is_file() {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(path)
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::ReadFile { path, source: e }
            }
        })
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        metadata: &ObjectMetadata,
    ) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        write_atomic(&path, body)?;
        // A put replaces the object, including any tags it had.
        self.write_sidecar(
            bucket,
            key,
            &Sidecar {
                metadata: metadata.clone(),
                tags: Vec::new(),
            },
        )
    }

    fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<(), StorageError> {
        let body = self.get(bucket, source_key)?;
        let sidecar = self.read_sidecar(bucket, source_key)?;
        self.put(bucket, dest_key, &body, &sidecar.metadata)
    }

    fn put_tags(&self, bucket: &str, key: &str, tags: &[Tag]) -> Result<(), StorageError> {
        self.require_object(bucket, key)?;
        let mut sidecar = self.read_sidecar(bucket, key)?;
        sidecar.tags = tags.to_vec();
        self.write_sidecar(bucket, key, &sidecar)
    }

    fn tags(&self, bucket: &str, key: &str) -> Result<Vec<Tag>, StorageError> {
        self.require_object(bucket, key)?;
        Ok(self.read_sidecar(bucket, key)?.tags)
    }

    fn metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, StorageError> {
        self.require_object(bucket, key)?;
        Ok(self.read_sidecar(bucket, key)?.metadata)
    }

    fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.object_path(bucket, key)?.is_file())
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_key(bucket)?;
        let bucket_root = self.root.join(bucket);
        if !bucket_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys: Vec<String> = collect_files(&bucket_root)?
            .into_iter()
            .filter_map(|path| {
                let relative = path.strip_prefix(&bucket_root).ok()?;
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                key.starts_with(prefix).then_some(key)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Writes `content` to a temporary sibling and renames it into place so that
/// readers never observe a half-written object.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("object");
    let tmp_path = path.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));

    std::fs::write(&tmp_path, content).map_err(|e| StorageError::WriteFile {
        path: tmp_path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

mod walk {
    use std::path::{Path, PathBuf};

    use crate::error::StorageError;

    /// Regular files below `dir`, skipping in-flight `.tmp-` files.
    pub(super) fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let entries = std::fs::read_dir(&current).map_err(|e| StorageError::ReadFile {
                path: current.clone(),
                source: e,
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| StorageError::ReadFile {
                    path: current.clone(),
                    source: e,
                })?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if !is_temp_file(&path) {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    fn is_temp_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.') && n.contains(".tmp-"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(pairs: &[(&str, &str)]) -> ObjectMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_put_and_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        store
            .put("bucket", "raw/mail-1", b"From: a@b.com", &ObjectMetadata::new())
            .unwrap();

        assert_eq!(store.get("bucket", "raw/mail-1").unwrap(), b"From: a@b.com");
        assert!(temp_dir.path().join("bucket/raw/mail-1").exists());
    }

    #[test]
    fn test_get_missing_object_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        match store.get("bucket", "raw/missing") {
            Err(StorageError::NotFound { bucket, key }) => {
                assert_eq!(bucket, "bucket");
                assert_eq!(key, "raw/missing");
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_metadata_and_tags_are_kept_in_sidecar() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        store
            .put("bucket", "a/b.csv", b"x,y", &meta(&[("received_from", "a-b-com")]))
            .unwrap();
        store
            .put_tags("bucket", "a/b.csv", &[Tag::new("Project", "EmailIntegration")])
            .unwrap();

        assert_eq!(
            store.metadata("bucket", "a/b.csv").unwrap().get("received_from"),
            Some(&"a-b-com".to_string())
        );
        assert_eq!(
            store.tags("bucket", "a/b.csv").unwrap(),
            vec![Tag::new("Project", "EmailIntegration")]
        );
        // Sidecars never show up as objects.
        assert_eq!(store.list("bucket", "").unwrap(), vec!["a/b.csv".to_string()]);
    }

    #[test]
    fn test_put_tags_on_missing_object_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        let result = store.put_tags("bucket", "nope", &[Tag::new("k", "v")]);
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn test_copy_carries_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        store
            .put("bucket", "raw/mail", b"body", &meta(&[("k", "v")]))
            .unwrap();
        store.copy("bucket", "raw/mail", "quarantine/emails/mail").unwrap();

        assert_eq!(store.get("bucket", "quarantine/emails/mail").unwrap(), b"body");
        assert_eq!(
            store.metadata("bucket", "quarantine/emails/mail").unwrap(),
            meta(&[("k", "v")])
        );
        assert!(store.exists("bucket", "raw/mail").unwrap());
    }

    #[test]
    fn test_list_filters_by_prefix_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());
        let empty = ObjectMetadata::new();

        store.put("bucket", "curated/t/dt=2/b.parquet", b"2", &empty).unwrap();
        store.put("bucket", "curated/t/dt=1/a.parquet", b"1", &empty).unwrap();
        store.put("bucket", "quarantine/x", b"q", &empty).unwrap();

        assert_eq!(
            store.list("bucket", "curated/").unwrap(),
            vec![
                "curated/t/dt=1/a.parquet".to_string(),
                "curated/t/dt=2/b.parquet".to_string()
            ]
        );
        assert!(store.list("other-bucket", "").unwrap().is_empty());
    }

    #[test]
    fn test_traversal_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        let result = store.put("bucket", "../escape", b"x", &ObjectMetadata::new());
        assert!(matches!(result, Err(StorageError::InvalidKey { .. })));
        assert!(!temp_dir.path().join("escape").exists());

        let result = store.put(SIDECAR_DIR, "key", b"x", &ObjectMetadata::new());
        assert!(matches!(result, Err(StorageError::InvalidKey { .. })));
    }

    #[test]
    fn test_overwrite_resets_tags() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(temp_dir.path());

        store.put("bucket", "k", b"one", &ObjectMetadata::new()).unwrap();
        store.put_tags("bucket", "k", &[Tag::new("a", "b")]).unwrap();
        store.put("bucket", "k", b"two", &ObjectMetadata::new()).unwrap();

        assert_eq!(store.get("bucket", "k").unwrap(), b"two");
        assert!(store.tags("bucket", "k").unwrap().is_empty());
    }
}
