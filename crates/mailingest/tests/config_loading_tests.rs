//! Table-driven tests for configuration loading and validation.

mod common;

use common::TestHarness;

use mailingest::config::{load_settings, load_settings_from_str, Environment};

/// Represents a single config loading test case.
struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object_uses_defaults",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "full_object",
        config_json: r#"{
            "ACCEPTED_SENDERS": "a@x.com, b@y.com",
            "POSSIBLE_EXTENSION_FILE": "csv, xlsx",
            "S3_PREFIX_CURATED": "lake/curated",
            "S3_PREFIX_QUARANTINE": "lake/quarantine"
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "extensions_as_array",
        config_json: r#"{ "POSSIBLE_EXTENSION_FILE": ["csv", ".XLS"] }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "unknown_keys_ignored",
        config_json: r#"{ "ACCEPTED_SENDERS": "a@x.com", "SOMETHING_ELSE": 42 }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "absolute_prefix",
        config_json: r#"{ "S3_PREFIX_CURATED": "/curated" }"#,
        should_succeed: false,
        expected_error: Some("must be relative"),
    },
    ConfigTestCase {
        name: "parent_segment",
        config_json: r#"{ "S3_PREFIX_QUARANTINE": "hold/../curated" }"#,
        should_succeed: false,
        expected_error: Some("invalid segment"),
    },
    ConfigTestCase {
        name: "same_prefixes",
        config_json: r#"{ "S3_PREFIX_CURATED": "lake", "S3_PREFIX_QUARANTINE": "lake" }"#,
        should_succeed: false,
        expected_error: Some("must differ"),
    },
    ConfigTestCase {
        name: "no_extensions",
        config_json: r#"{ "POSSIBLE_EXTENSION_FILE": " , " }"#,
        should_succeed: false,
        expected_error: Some("extension set is empty"),
    },
    ConfigTestCase {
        name: "not_json",
        config_json: "ACCEPTED_SENDERS=a@x.com",
        should_succeed: false,
        expected_error: None,
    },
];

#[test]
fn test_config_loading_cases() {
    let env = Environment::new("mail-intake");

    for case in CONFIG_TESTS {
        let result = load_settings_from_str(case.config_json, &env);

        if case.should_succeed {
            assert!(
                result.is_ok(),
                "case '{}' should succeed, got {:?}",
                case.name,
                result.err()
            );
        } else {
            let err = match result {
                Ok(_) => panic!("case '{}' should fail", case.name),
                Err(e) => e.to_string(),
            };
            if let Some(expected) = case.expected_error {
                assert!(
                    err.contains(expected),
                    "case '{}': error '{}' does not contain '{}'",
                    case.name,
                    err,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_environment_fills_gaps() {
    let mut env = Environment::new("mail-intake");
    env.curated_prefix = "env-curated".to_string();
    env.default_extensions = "csv".to_string();

    let settings = load_settings_from_str(r#"{ "S3_PREFIX_QUARANTINE": "cfg-hold/" }"#, &env).unwrap();

    assert_eq!(settings.curated_prefix, "env-curated");
    assert_eq!(settings.quarantine_prefix, "cfg-hold");
    assert!(settings.supported_extensions.contains("csv"));
    assert!(!settings.supported_extensions.contains("xlsx"));
}

#[test]
fn test_settings_read_from_bucket() {
    let harness = TestHarness::new();

    let settings = load_settings(harness.store.as_ref(), &harness.env).unwrap();

    assert!(settings.accepted_senders.accepts("reports@vendor.com"));
    assert!(settings.accepted_senders.accepts("TRUSTED_EMAILS@SERVER.COM"));
    assert!(!settings.accepted_senders.accepts("x@other.com"));
    assert!(settings.supported_extensions.contains("xls"));
}

#[test]
fn test_missing_config_object_names_location() {
    let harness = TestHarness::without_config();

    let err = load_settings(harness.store.as_ref(), &harness.env).unwrap_err();

    assert!(err.to_string().contains("config/email.json"), "{}", err);
}
