use crate::config::schema::{EmailConfiguration, Environment, IngestSettings};
use crate::error::ConfigError;
use crate::storage::ObjectStore;

/// Fetches the configuration object from storage and resolves it against the
/// environment defaults.
pub fn load_settings(
    store: &dyn ObjectStore,
    env: &Environment,
) -> Result<IngestSettings, ConfigError> {
    if env.bucket.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "bucket name must not be empty".to_string(),
        });
    }

    let bytes = store
        .get(&env.bucket, &env.config_key)
        .map_err(|source| ConfigError::LoadObject {
            bucket: env.bucket.clone(),
            key: env.config_key.clone(),
            source,
        })?;

    let content = String::from_utf8_lossy(&bytes);
    load_settings_from_str(&content, env)
}

pub fn load_settings_from_str(
    content: &str,
    env: &Environment,
) -> Result<IngestSettings, ConfigError> {
    let config: EmailConfiguration = serde_json::from_str(content)?;

    let settings = IngestSettings::resolve(env, &config);

    validate_settings(&settings)?;

    Ok(settings)
}

pub fn validate_settings(settings: &IngestSettings) -> Result<(), ConfigError> {
    if settings.bucket.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "bucket name must not be empty".to_string(),
        });
    }

    if settings.database.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "catalog database name must not be empty".to_string(),
        });
    }

    validate_prefix("curated", &settings.curated_prefix)?;
    validate_prefix("quarantine", &settings.quarantine_prefix)?;

    if settings.curated_prefix == settings.quarantine_prefix {
        return Err(ConfigError::Validation {
            message: format!(
                "curated and quarantine prefixes must differ (both '{}')",
                settings.curated_prefix
            ),
        });
    }

    if settings.supported_extensions.is_empty() {
        return Err(ConfigError::Validation {
            message: "supported extension set is empty".to_string(),
        });
    }

    if settings.settle.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "settle policy needs at least one attempt".to_string(),
        });
    }

    Ok(())
}

fn validate_prefix(name: &str, prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("{} prefix must not be empty", name),
        });
    }

    if prefix.starts_with('/') {
        return Err(ConfigError::Validation {
            message: format!("{} prefix '{}' must be relative", name, prefix),
        });
    }

    if prefix.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(ConfigError::Validation {
            message: format!("{} prefix '{}' contains an invalid segment", name, prefix),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObjectStore, ObjectMetadata};

    fn env() -> Environment {
        Environment::new("mail-bucket")
    }

    #[test]
    fn test_load_settings_from_store() {
        let store = MemoryObjectStore::new();
        store
            .put(
                "mail-bucket",
                "config/email.json",
                br#"{"ACCEPTED_SENDERS": "trusted_emails@server.com", "S3_PREFIX_CURATED": "lake"}"#,
                &ObjectMetadata::new(),
            )
            .unwrap();

        let settings = load_settings(&store, &env()).unwrap();
        assert!(settings.accepted_senders.accepts("TRUSTED_EMAILS@server.com"));
        assert_eq!(settings.curated_prefix, "lake");
    }

    #[test]
    fn test_missing_config_object_is_load_error() {
        let store = MemoryObjectStore::new();
        let err = load_settings(&store, &env()).unwrap_err();
        assert!(matches!(err, ConfigError::LoadObject { ref key, .. } if key == "config/email.json"));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = load_settings_from_str("{not json", &env()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson(_)));
    }

    #[test]
    fn test_rejects_traversal_prefix() {
        let err =
            load_settings_from_str(r#"{"S3_PREFIX_QUARANTINE": "../outside"}"#, &env()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_absolute_prefix() {
        let err = load_settings_from_str(r#"{"S3_PREFIX_CURATED": "/curated"}"#, &env()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_empty_extension_set() {
        let err =
            load_settings_from_str(r#"{"POSSIBLE_EXTENSION_FILE": " , "}"#, &env()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_rejects_shared_prefix() {
        let err = load_settings_from_str(
            r#"{"S3_PREFIX_CURATED": "data", "S3_PREFIX_QUARANTINE": "data/"}"#,
            &env(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_empty_bucket_is_rejected_before_fetch() {
        let store = MemoryObjectStore::new();
        let err = load_settings(&store, &Environment::new("  ")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
