//! Parquet encoding and the curated storage layout.

use std::io::Cursor;

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::convert::Table;
use crate::error::{ConvertError, IngestError};
use crate::storage::ObjectStore;

pub const PART_SUFFIX: &str = ".snappy.parquet";

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_created_by(format!("mailingest {}", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Encodes a table as one Snappy-compressed Parquet file.
pub fn encode_parquet(table: &Table) -> Result<Vec<u8>, ConvertError> {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, table.schema(), Some(writer_properties()))?;
    writer.write(table.batch())?;
    writer.close()?;
    Ok(cursor.into_inner())
}

pub fn decode_parquet(bytes: Vec<u8>) -> Result<Vec<RecordBatch>, ConvertError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes))?.build()?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

/// `{curated_prefix}/{logical_name}`
pub fn dataset_location(curated_prefix: &str, logical_name: &str) -> String {
    format!("{}/{}", curated_prefix, logical_name)
}

/// `{dataset}/dt={YYYYMMDD}/sender={sender}`
pub fn partition_location(dataset: &str, date: &str, sender: &str) -> String {
    format!("{}/dt={}/sender={}", dataset, date, sender)
}

/// Part files are named after the first 16 hex digits of the ingestion key.
pub fn part_key(partition: &str, ingestion_key: &str) -> String {
    let stem: String = ingestion_key.chars().take(16).collect();
    format!("{}/{}{}", partition, stem, PART_SUFFIX)
}

/// `original_{curated_prefix}/{YYYYMMDD}/{sender}/{logical_name}`
pub fn original_key(curated_prefix: &str, date: &str, sender: &str, logical_name: &str) -> String {
    format!(
        "original_{}/{}/{}/{}",
        curated_prefix, date, sender, logical_name
    )
}

/// Reads every part file under a dataset location, in key order.
pub fn read_dataset(
    store: &dyn ObjectStore,
    bucket: &str,
    location: &str,
) -> Result<Vec<RecordBatch>, IngestError> {
    let prefix = format!("{}/", location.trim_end_matches('/'));
    let mut batches = Vec::new();
    for key in store.list(bucket, &prefix)? {
        if !key.ends_with(".parquet") {
            continue;
        }
        let bytes = store.get(bucket, &key)?;
        batches.extend(decode_parquet(bytes)?);
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::csv::read_csv;
    use crate::storage::{MemoryObjectStore, ObjectMetadata};
    use parquet::file::reader::{FileReader, SerializedFileReader};

    #[test]
    fn test_layout_paths() {
        let dataset = dataset_location("curated", "sales-csv");
        let partition = partition_location(&dataset, "20210111", "a-x-com");
        assert_eq!(partition, "curated/sales-csv/dt=20210111/sender=a-x-com");
        assert_eq!(
            part_key(&partition, "0123456789abcdef0123"),
            "curated/sales-csv/dt=20210111/sender=a-x-com/0123456789abcdef.snappy.parquet"
        );
        assert_eq!(
            original_key("curated", "20210111", "a-x-com", "sales-csv"),
            "original_curated/20210111/a-x-com/sales-csv"
        );
    }

    #[test]
    fn test_parquet_is_snappy_compressed() {
        let table = read_csv(b"id,name\n1,a\n2,b\n").unwrap();
        let bytes = encode_parquet(&table).unwrap();

        let reader = SerializedFileReader::new(Bytes::from(bytes)).unwrap();
        let column = reader.metadata().row_group(0).column(0);
        assert_eq!(column.compression(), Compression::SNAPPY);
        assert_eq!(reader.metadata().file_metadata().num_rows(), 2);
    }

    #[test]
    fn test_read_dataset_collects_all_parts() {
        let store = MemoryObjectStore::new();
        let table = read_csv(b"id\n1\n2\n").unwrap();
        let bytes = encode_parquet(&table).unwrap();
        let empty = ObjectMetadata::new();

        store.put("b", "curated/t/dt=1/sender=a/p1.snappy.parquet", &bytes, &empty).unwrap();
        store.put("b", "curated/t/dt=2/sender=a/p2.snappy.parquet", &bytes, &empty).unwrap();
        store.put("b", "curated/t/_notes.txt", b"skip", &empty).unwrap();
        store.put("b", "curated/t2/dt=1/sender=a/p.snappy.parquet", &bytes, &empty).unwrap();

        let batches = read_dataset(&store, "b", "curated/t").unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 4);
    }
}
