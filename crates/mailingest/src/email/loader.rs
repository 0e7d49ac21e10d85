use log::{debug, warn};

use crate::storage::ObjectStore;

use super::error::{EmailError, Result};
use super::parsed::{ParsedEmail, RawEmailRef};

/// Fetches raw emails from object storage and parses them.
pub struct EmailLoader<'s> {
    store: &'s dyn ObjectStore,
}

impl<'s> EmailLoader<'s> {
    pub fn new(store: &'s dyn ObjectStore) -> Self {
        Self { store }
    }

    pub fn load(&self, source: &RawEmailRef) -> Result<ParsedEmail> {
        let raw = self
            .store
            .get(&source.bucket, &source.key)
            .inspect_err(|e| warn!("Failed to fetch {}/{}: {}", source.bucket, source.key, e))?;

        debug!("Fetched {} bytes from {}/{}", raw.len(), source.bucket, source.key);

        ParsedEmail::parse(source.clone(), &raw).inspect_err(|e| {
            if let EmailError::ParseError(_) | EmailError::Empty { .. } = e {
                warn!("Unparseable email {}: {}", source.key, e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObjectStore, ObjectMetadata};

    #[test]
    fn test_missing_object_is_storage_error() {
        let store = MemoryObjectStore::new();
        let loader = EmailLoader::new(&store);
        assert!(matches!(
            loader.load(&RawEmailRef::new("mail", "raw/none")),
            Err(EmailError::Storage(_))
        ));
    }

    #[test]
    fn test_loads_stored_email() {
        let store = MemoryObjectStore::new();
        store
            .put(
                "mail",
                "raw/one",
                b"From: a@x.com\r\nTo: b@y.com\r\nSubject: hi\r\n\r\nbody\r\n",
                &ObjectMetadata::new(),
            )
            .unwrap();

        let email = EmailLoader::new(&store)
            .load(&RawEmailRef::new("mail", "raw/one"))
            .unwrap();
        assert_eq!(email.subject.as_deref(), Some("hi"));
        assert_eq!(email.source.key, "raw/one");
    }
}
