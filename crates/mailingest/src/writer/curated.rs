use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{
    Catalog, ColumnSpec, LedgerEntry, PartitionSpec, TableRegistration, TableStatus,
    PARTITION_KEYS, SOURCE_PARAMETER, TABLE_DESCRIPTION,
};
use crate::config::{IngestSettings, PROJECT_TAG_KEY, PROJECT_TAG_VALUE};
use crate::convert::Table;
use crate::email::{Attachment, ParsedEmail};
use crate::error::CurateError;
use crate::sanitize::table_name;
use crate::storage::{tag_when_visible, ObjectStore, Tag};

use super::dataset::{dataset_location, encode_parquet, original_key, part_key, partition_location};
use super::idempotency::compute_ingestion_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurateOutcome {
    Curated {
        /// `{database}.{table}`
        table: String,
        table_status: TableStatus,
        rows: usize,
        /// Original payload first, then the part file.
        objects: Vec<String>,
    },
    /// The ledger already holds this attachment; nothing was written.
    AlreadyIngested { ingestion_key: String },
}

/// Writes converted tables into the partitioned curated area.
pub struct CuratedWriter<'a> {
    settings: &'a IngestSettings,
    store: &'a dyn ObjectStore,
    catalog: &'a dyn Catalog,
}

impl<'a> CuratedWriter<'a> {
    pub fn new(
        settings: &'a IngestSettings,
        store: &'a dyn ObjectStore,
        catalog: &'a dyn Catalog,
    ) -> Self {
        Self {
            settings,
            store,
            catalog,
        }
    }

    pub fn curate(
        &self,
        email: &ParsedEmail,
        attachment: &Attachment<'_>,
        table: &Table,
    ) -> Result<CurateOutcome, CurateError> {
        let ingestion_key = compute_ingestion_key(&email.source, attachment);
        if self.catalog.is_ingested(&ingestion_key)? {
            info!(key = %ingestion_key, "attachment already ingested, skipping");
            return Ok(CurateOutcome::AlreadyIngested { ingestion_key });
        }

        let bucket = email.source.bucket.as_str();
        let metadata = attachment.metadata();
        let date = metadata.partition_date();
        let sender = metadata.received_from();
        let prefix = self.settings.curated_prefix.as_str();

        let original = original_key(prefix, &date, sender, &attachment.logical_name);
        self.store.put(
            bucket,
            &original,
            attachment.payload,
            &metadata.to_object_metadata(),
        )?;
        debug!(key = %original, "original payload stored");

        let dataset = dataset_location(prefix, &attachment.logical_name);
        let partition = partition_location(&dataset, &date, sender);
        let part = part_key(&partition, &ingestion_key);
        let encoded = encode_parquet(table)?;
        self.store
            .put(bucket, &part, &encoded, &metadata.to_object_metadata())?;
        debug!(key = %part, rows = table.num_rows(), "part file stored");

        let name = table_name(&attachment.logical_name);
        let table_status = self.catalog.register_table(&TableRegistration {
            database: self.settings.database.clone(),
            name: name.clone(),
            location: dataset,
            columns: table
                .columns()
                .iter()
                .map(|(column, data_type)| ColumnSpec::from_arrow(column, data_type))
                .collect(),
            partition_keys: PARTITION_KEYS.iter().map(|k| k.to_string()).collect(),
            description: TABLE_DESCRIPTION.to_string(),
            parameters: BTreeMap::from([
                ("source".to_string(), SOURCE_PARAMETER.to_string()),
                ("sender".to_string(), metadata.raw_sender().to_string()),
            ]),
        })?;
        self.catalog.add_partition(
            &self.settings.database,
            &name,
            &PartitionSpec {
                values: vec![date.clone(), sender.to_string()],
                location: partition,
            },
        )?;

        let tags = [Tag::new(PROJECT_TAG_KEY, PROJECT_TAG_VALUE)];
        for key in [&original, &part] {
            tag_when_visible(self.store, bucket, key, &tags, &self.settings.settle)?;
        }

        // Only fully tagged writes enter the ledger; anything less is redone
        // on redelivery.
        self.catalog.record_ingestion(&LedgerEntry {
            ingestion_key,
            database: self.settings.database.clone(),
            table: name.clone(),
            object_key: part.clone(),
            source_key: email.source.key.clone(),
            rows: table.num_rows() as u64,
        })?;
        let objects = vec![original, part];

        let qualified = format!("{}.{}", self.settings.database, name);
        info!(table = %qualified, ?table_status, rows = table.num_rows(), "attachment curated");

        Ok(CurateOutcome::Curated {
            table: qualified,
            table_status,
            rows: table.num_rows(),
            objects,
        })
    }
}
