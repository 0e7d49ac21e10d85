use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Email error: {0}")]
    Email(#[from] crate::email::EmailError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Curation error: {0}")]
    Curate(#[from] CurateError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration object '{bucket}/{key}': {source}")]
    LoadObject {
        bucket: String,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to parse configuration JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum EventError {
    #[error("Malformed event JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Event record {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Invalid object key encoding '{key}': {reason}")]
    KeyEncoding { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt object sidecar '{path}': {source}")]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Object {bucket}/{key} not visible after {attempts} attempts")]
    NotVisible {
        bucket: String,
        key: String,
        attempts: u32,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode catalog metadata: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to create catalog directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Catalog lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Input has no header row")]
    EmptyInput,

    #[error("CSV decoding failed: {0}")]
    Csv(String),

    #[error("Spreadsheet decoding failed: {0}")]
    Spreadsheet(String),

    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

#[derive(Error, Debug)]
pub enum CurateError {
    #[error("Failed to encode dataset: {0}")]
    Encode(#[from] ConvertError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
