use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::storage::SettlePolicy;

pub const DEFAULT_CONFIG_KEY: &str = "config/email.json";
pub const DEFAULT_EXTENSIONS: &str = "csv, xls, xlsx";
pub const DEFAULT_CURATED_PREFIX: &str = "curated";
pub const DEFAULT_QUARANTINE_PREFIX: &str = "quarantine";
pub const DEFAULT_DATABASE: &str = "email_ingest";

/// Tag applied to every object written by the pipeline.
pub const PROJECT_TAG_KEY: &str = "Project";
pub const PROJECT_TAG_VALUE: &str = "EmailIntegration";

/// Values provided by the hosting environment.
///
/// These are the fallbacks for anything the configuration object omits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub bucket: String,
    #[serde(default = "default_config_key")]
    pub config_key: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_curated_prefix")]
    pub curated_prefix: String,
    #[serde(default = "default_quarantine_prefix")]
    pub quarantine_prefix: String,
    #[serde(default = "default_extensions")]
    pub default_extensions: String,
    #[serde(default)]
    pub settle: SettlePolicy,
}

fn default_config_key() -> String {
    DEFAULT_CONFIG_KEY.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_curated_prefix() -> String {
    DEFAULT_CURATED_PREFIX.to_string()
}

fn default_quarantine_prefix() -> String {
    DEFAULT_QUARANTINE_PREFIX.to_string()
}

fn default_extensions() -> String {
    DEFAULT_EXTENSIONS.to_string()
}

impl Environment {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            config_key: default_config_key(),
            database: default_database(),
            curated_prefix: default_curated_prefix(),
            quarantine_prefix: default_quarantine_prefix(),
            default_extensions: default_extensions(),
            settle: SettlePolicy::default(),
        }
    }
}

/// The JSON configuration object stored next to the raw emails.
///
/// Unknown keys are ignored so the same object can carry settings for other
/// consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfiguration {
    #[serde(rename = "ACCEPTED_SENDERS", default)]
    pub accepted_senders: Option<String>,
    #[serde(rename = "POSSIBLE_EXTENSION_FILE", default)]
    pub possible_extensions: Option<ExtensionList>,
    #[serde(rename = "S3_PREFIX_QUARANTINE", default)]
    pub quarantine_prefix: Option<String>,
    #[serde(rename = "S3_PREFIX_CURATED", default)]
    pub curated_prefix: Option<String>,
}

/// Extensions written either as `"csv, xlsx"` or `["csv", "xlsx"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionList {
    Joined(String),
    List(Vec<String>),
}

impl ExtensionList {
    pub fn to_set(&self) -> ExtensionSet {
        match self {
            ExtensionList::Joined(joined) => ExtensionSet::parse(joined),
            ExtensionList::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

/// Case-insensitive sender allow-list matched by substring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    /// Parses a comma-separated list. Entries are trimmed and lower-cased;
    /// empty entries are dropped since they would match every sender.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { entries }
    }

    pub fn accepts(&self, sender: &str) -> bool {
        let sender = sender.to_lowercase();
        self.entries.iter().any(|entry| sender.contains(entry.as_str()))
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lower-case extensions without the leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    pub fn parse(raw: &str) -> Self {
        raw.split(',').collect()
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(&extension.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        )
    }
}

/// Everything one invocation needs, resolved once from the environment and
/// the configuration object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSettings {
    pub bucket: String,
    pub database: String,
    pub accepted_senders: AllowList,
    pub supported_extensions: ExtensionSet,
    pub curated_prefix: String,
    pub quarantine_prefix: String,
    pub settle: SettlePolicy,
}

impl IngestSettings {
    pub fn resolve(env: &Environment, config: &EmailConfiguration) -> Self {
        let supported_extensions = config
            .possible_extensions
            .as_ref()
            .map(ExtensionList::to_set)
            .unwrap_or_else(|| ExtensionSet::parse(&env.default_extensions));

        Self {
            bucket: env.bucket.clone(),
            database: env.database.clone(),
            accepted_senders: config
                .accepted_senders
                .as_deref()
                .map(AllowList::parse)
                .unwrap_or_default(),
            supported_extensions,
            curated_prefix: normalize_prefix(
                config.curated_prefix.as_deref().unwrap_or(&env.curated_prefix),
            ),
            quarantine_prefix: normalize_prefix(
                config
                    .quarantine_prefix
                    .as_deref()
                    .unwrap_or(&env.quarantine_prefix),
            ),
            settle: env.settle,
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    prefix.trim().trim_end_matches('/').to_string()
}
