//! Excel workbooks, first worksheet only.

use std::io::{Cursor, Read, Seek};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use calamine::{open_workbook_from_rs, Data, DataType as _, Range, Reader, Xls, Xlsx};

use crate::error::ConvertError;

use super::{normalize_headers, Table};

static EMPTY_CELL: Data = Data::Empty;

pub fn read_xlsx(payload: &[u8]) -> Result<Table, ConvertError> {
    let workbook = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(payload))
        .map_err(|e| ConvertError::Spreadsheet(e.to_string()))?;
    first_sheet(workbook)
}

pub fn read_xls(payload: &[u8]) -> Result<Table, ConvertError> {
    let workbook = open_workbook_from_rs::<Xls<_>, _>(Cursor::new(payload))
        .map_err(|e| ConvertError::Spreadsheet(e.to_string()))?;
    first_sheet(workbook)
}

fn first_sheet<RS, R>(mut workbook: R) -> Result<Table, ConvertError>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ConvertError::NoWorksheet)?
        .map_err(|e| ConvertError::Spreadsheet(e.to_string()))?;
    range_to_table(&range)
}

/// Converts a cell range whose first row is the header.
pub fn range_to_table(range: &Range<Data>) -> Result<Table, ConvertError> {
    let mut rows = range.rows();
    let header = rows.next().ok_or(ConvertError::EmptyInput)?;
    if header.iter().all(is_blank) {
        return Err(ConvertError::EmptyInput);
    }

    let mut body: Vec<&[Data]> = rows.collect();
    while body.last().is_some_and(|row| row.iter().all(is_blank)) {
        body.pop();
    }

    let names = normalize_headers(
        &header
            .iter()
            .map(|cell| render(cell).unwrap_or_default())
            .collect::<Vec<_>>(),
    );

    let mut fields = Vec::with_capacity(names.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(names.len());
    for (col, name) in names.into_iter().enumerate() {
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(col).unwrap_or(&EMPTY_CELL))
            .collect();
        let (data_type, array) = build_column(&cells);
        fields.push(Field::new(name, data_type, true));
        columns.push(array);
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?;
    Ok(Table::new(batch))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
}

fn build_column(cells: &[&Data]) -> (DataType, ArrayRef) {
    match infer_column(cells) {
        ColumnType::Int => (
            DataType::Int64,
            Arc::new(cells.iter().map(|c| as_int(c)).collect::<Int64Array>()),
        ),
        ColumnType::Float => (
            DataType::Float64,
            Arc::new(cells.iter().map(|c| as_float(c)).collect::<Float64Array>()),
        ),
        ColumnType::Bool => (
            DataType::Boolean,
            Arc::new(
                cells
                    .iter()
                    .map(|c| match c {
                        Data::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect::<BooleanArray>(),
            ),
        ),
        ColumnType::Text => (
            DataType::Utf8,
            Arc::new(cells.iter().map(|c| render(c)).collect::<StringArray>()),
        ),
    }
}

fn infer_column(cells: &[&Data]) -> ColumnType {
    let mut seen: Option<ColumnType> = None;

    for cell in cells.iter().filter(|c| !is_blank(c)) {
        let kind = match cell {
            Data::Int(_) => ColumnType::Int,
            Data::Float(f) if is_whole(*f) => ColumnType::Int,
            Data::Float(_) => ColumnType::Float,
            Data::Bool(_) => ColumnType::Bool,
            _ => ColumnType::Text,
        };

        seen = Some(match (seen, kind) {
            (None, k) => k,
            (Some(a), b) if a == b => a,
            (Some(ColumnType::Int), ColumnType::Float) | (Some(ColumnType::Float), ColumnType::Int) => {
                ColumnType::Float
            }
            _ => return ColumnType::Text,
        });
    }

    seen.unwrap_or(ColumnType::Text)
}

/// Whole numbers that fit an `i64`. Workbooks store most integers as floats.
fn is_whole(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15
}

fn as_int(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if is_whole(*f) => Some(*f as i64),
        _ => None,
    }
}

fn as_float(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        _ => None,
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text form of a cell; `None` for empty and error cells.
fn render(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(_) => cell.as_datetime().map(|dt| {
            if dt.time() == chrono::NaiveTime::MIN {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
        }),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}
