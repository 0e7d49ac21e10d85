pub mod loader;
pub mod schema;

pub use loader::{load_settings, load_settings_from_str, validate_settings};
pub use schema::{
    AllowList, EmailConfiguration, Environment, ExtensionList, ExtensionSet, IngestSettings,
    DEFAULT_CONFIG_KEY, DEFAULT_EXTENSIONS, PROJECT_TAG_KEY, PROJECT_TAG_VALUE,
};
