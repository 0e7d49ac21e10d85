//! Attachment classification and conversion into Arrow tables.

pub mod csv;
pub mod spreadsheet;

use std::collections::HashSet;
use std::sync::Arc;

use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::Serialize;
use tracing::debug;

use crate::config::ExtensionSet;
use crate::email::{extension_of, Attachment};
use crate::error::ConvertError;

/// Tabular formats the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Csv,
    /// BIFF `.xls` workbook.
    LegacySpreadsheet,
    /// OOXML `.xlsx` workbook.
    ModernSpreadsheet,
    Unsupported,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "csv" => FileKind::Csv,
            "xls" => FileKind::LegacySpreadsheet,
            "xlsx" => FileKind::ModernSpreadsheet,
            _ => FileKind::Unsupported,
        }
    }

    /// Kind of `filename`, gated by the configured extension set.
    pub fn classify(filename: &str, supported: &ExtensionSet) -> Self {
        let ext = extension_of(filename);
        if ext.is_empty() || !supported.contains(&ext) {
            return FileKind::Unsupported;
        }
        FileKind::from_extension(&ext)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FileKind::Unsupported)
    }
}

/// A converted attachment: one record batch with nullable columns.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Column names with their Arrow types, in schema order.
    pub fn columns(&self) -> Vec<(String, DataType)> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| (f.name().clone(), f.data_type().clone()))
            .collect()
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

#[derive(Debug)]
pub enum ConversionOutcome {
    Converted(Table),
    /// Not a tabular format this deployment accepts.
    Unsupported { extension: String },
    Faulted(ConvertError),
}

/// Dispatches attachments to the matching decoder.
pub struct Converter<'a> {
    supported: &'a ExtensionSet,
}

impl<'a> Converter<'a> {
    pub fn new(supported: &'a ExtensionSet) -> Self {
        Self { supported }
    }

    pub fn classify(&self, attachment: &Attachment<'_>) -> FileKind {
        FileKind::classify(attachment.filename, self.supported)
    }

    pub fn convert(&self, attachment: &Attachment<'_>) -> ConversionOutcome {
        let kind = self.classify(attachment);
        debug!(filename = %attachment.filename, ?kind, "classified attachment");

        let result = match kind {
            FileKind::Csv => csv::read_csv(attachment.payload),
            FileKind::LegacySpreadsheet => spreadsheet::read_xls(attachment.payload),
            FileKind::ModernSpreadsheet => spreadsheet::read_xlsx(attachment.payload),
            FileKind::Unsupported => {
                return ConversionOutcome::Unsupported {
                    extension: attachment.extension.clone(),
                }
            }
        };

        match result {
            Ok(table) => ConversionOutcome::Converted(table),
            Err(e) => ConversionOutcome::Faulted(e),
        }
    }
}

/// Makes header names usable as column names.
///
/// Blank names become `column_<n>` (1-based position) and repeated names get
/// a `_<k>` suffix, starting at 2 for the second occurrence.
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());

    for (i, name) in raw.iter().enumerate() {
        let base = match name.as_ref().trim() {
            "" => format!("column_{}", i + 1),
            trimmed => trimmed.to_string(),
        };

        let mut candidate = base.clone();
        let mut k = 2;
        while used.contains(&candidate) {
            candidate = format!("{}_{}", base, k);
            k += 1;
        }

        used.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

pub(crate) fn empty_table(schema: SchemaRef) -> Table {
    Table::new(RecordBatch::new_empty(Arc::clone(&schema)))
}
