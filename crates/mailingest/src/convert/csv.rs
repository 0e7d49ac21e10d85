//! CSV attachments.

use std::io::Cursor;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};

use crate::error::ConvertError;

use super::{empty_table, normalize_headers, Table};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a CSV payload with a header row, sniffing column types over every
/// row.
pub fn read_csv(payload: &[u8]) -> Result<Table, ConvertError> {
    let data = payload.strip_prefix(UTF8_BOM).unwrap_or(payload);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(ConvertError::EmptyInput);
    }

    let format = Format::default().with_header(true);
    let (inferred, _) = format
        .infer_schema(Cursor::new(data), None)
        .map_err(|e| ConvertError::Csv(e.to_string()))?;

    if inferred.fields().is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let names = normalize_headers(
        &inferred
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect::<Vec<_>>(),
    );
    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .zip(names)
            .map(|(field, name)| {
                // Columns with no values at all are kept as nullable strings.
                let data_type = match field.data_type() {
                    DataType::Null => DataType::Utf8,
                    other => other.clone(),
                };
                Field::new(name, data_type, true)
            })
            .collect::<Vec<_>>(),
    ));

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .build(Cursor::new(data))
        .map_err(|e| ConvertError::Csv(e.to_string()))?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConvertError::Csv(e.to_string()))?;

    if batches.is_empty() {
        return Ok(empty_table(schema));
    }

    Ok(Table::new(concat_batches(&schema, &batches)?))
}
