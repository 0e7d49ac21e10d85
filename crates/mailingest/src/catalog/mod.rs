//! Table catalog for curated datasets, plus the ingestion ledger used to
//! deduplicate redelivered attachments.

pub mod migrations;
pub mod sqlite;

use std::collections::BTreeMap;

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub use sqlite::SqliteCatalog;

/// Partition columns of every curated table, in path order.
pub const PARTITION_KEYS: [&str; 2] = ["dt", "sender"];

pub const TABLE_DESCRIPTION: &str = "Table created automatically from the email parser system";
pub const SOURCE_PARAMETER: &str = "emailParserSystem";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Catalog type name (`bigint`, `double`, `boolean`, `date`,
    /// `timestamp`, `string`).
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn from_arrow(name: &str, data_type: &DataType) -> Self {
        Self::new(name, catalog_type(data_type))
    }
}

/// Maps an Arrow type onto the catalog's type names.
pub fn catalog_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => "bigint",
        DataType::Float16 | DataType::Float32 | DataType::Float64 => "double",
        DataType::Boolean => "boolean",
        DataType::Date32 | DataType::Date64 => "date",
        DataType::Timestamp(_, _) => "timestamp",
        _ => "string",
    }
}

/// Desired state of a table; created when absent, merged when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRegistration {
    pub database: String,
    pub name: String,
    pub location: String,
    pub columns: Vec<ColumnSpec>,
    pub partition_keys: Vec<String>,
    pub description: String,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogTable {
    pub database: String,
    pub name: String,
    pub location: String,
    pub columns: Vec<ColumnSpec>,
    pub partition_keys: Vec<String>,
    pub description: String,
    pub parameters: BTreeMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Values for [`PARTITION_KEYS`], same order.
    pub values: Vec<String>,
    pub location: String,
}

/// One curated ingestion, keyed by its ingestion key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub ingestion_key: String,
    pub database: String,
    pub table: String,
    pub object_key: String,
    pub source_key: String,
    pub rows: u64,
}

pub trait Catalog: Send + Sync {
    fn register_table(&self, registration: &TableRegistration) -> Result<TableStatus, CatalogError>;

    /// Adds a partition; returns `false` when it already existed.
    fn add_partition(
        &self,
        database: &str,
        table: &str,
        partition: &PartitionSpec,
    ) -> Result<bool, CatalogError>;

    fn table(&self, database: &str, name: &str) -> Result<Option<CatalogTable>, CatalogError>;

    fn partitions(&self, database: &str, table: &str) -> Result<Vec<PartitionSpec>, CatalogError>;

    fn is_ingested(&self, ingestion_key: &str) -> Result<bool, CatalogError>;

    fn record_ingestion(&self, entry: &LedgerEntry) -> Result<(), CatalogError>;
}

/// Existing columns first, then new ones in registration order. A column
/// keeps the type it was first registered with.
pub fn merge_columns(existing: &[ColumnSpec], incoming: &[ColumnSpec]) -> Vec<ColumnSpec> {
    let mut merged = existing.to_vec();
    for column in incoming {
        if !merged.iter().any(|c| c.name == column.name) {
            merged.push(column.clone());
        }
    }
    merged
}
