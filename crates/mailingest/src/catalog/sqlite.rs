use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::CatalogError;

use super::{
    merge_columns, migrations, Catalog, CatalogTable, LedgerEntry, PartitionSpec,
    TableRegistration, TableStatus,
};

/// Catalog backed by a single SQLite connection.
///
/// Cloning is cheap; all access is serialized through a `Mutex`.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Opens (or creates) the catalog at `path` and applies pending
    /// migrations.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;

        log::info!("Catalog opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&Connection) -> Result<T, CatalogError>,
    {
        let conn = self.conn.lock().map_err(|_| CatalogError::LockPoisoned)?;
        f(&conn)
    }

    /// Number of ledger entries recorded for a table.
    pub fn ingestion_count(&self, database: &str, table: &str) -> Result<u64, CatalogError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM ingestion_ledger WHERE database_name = ?1 AND table_name = ?2",
                params![database, table],
                |r| r.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }
}

fn load_table(
    conn: &Connection,
    database: &str,
    name: &str,
) -> Result<Option<CatalogTable>, CatalogError> {
    let row = conn
        .query_row(
            "SELECT location, columns, partition_keys, description, parameters, created_at, updated_at
             FROM catalog_tables WHERE database_name = ?1 AND name = ?2",
            params![database, name],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((location, columns, partition_keys, description, parameters, created_at, updated_at)) =
        row
    else {
        return Ok(None);
    };

    Ok(Some(CatalogTable {
        database: database.to_string(),
        name: name.to_string(),
        location,
        columns: serde_json::from_str(&columns)?,
        partition_keys: serde_json::from_str(&partition_keys)?,
        description,
        parameters: serde_json::from_str(&parameters)?,
        created_at,
        updated_at,
    }))
}

impl Catalog for SqliteCatalog {
    fn register_table(&self, reg: &TableRegistration) -> Result<TableStatus, CatalogError> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| match load_table(conn, &reg.database, &reg.name)? {
            None => {
                conn.execute(
                    "INSERT INTO catalog_tables
                     (database_name, name, location, columns, partition_keys, description, parameters, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        reg.database,
                        reg.name,
                        reg.location,
                        serde_json::to_string(&reg.columns)?,
                        serde_json::to_string(&reg.partition_keys)?,
                        reg.description,
                        serde_json::to_string(&reg.parameters)?,
                        now,
                    ],
                )?;
                log::info!("Created catalog table {}.{}", reg.database, reg.name);
                Ok(TableStatus::Created)
            }
            Some(existing) => {
                let columns = merge_columns(&existing.columns, &reg.columns);
                let mut parameters = existing.parameters;
                parameters.extend(reg.parameters.clone());

                conn.execute(
                    "UPDATE catalog_tables
                     SET location = ?3, columns = ?4, partition_keys = ?5, description = ?6,
                         parameters = ?7, updated_at = ?8
                     WHERE database_name = ?1 AND name = ?2",
                    params![
                        reg.database,
                        reg.name,
                        reg.location,
                        serde_json::to_string(&columns)?,
                        serde_json::to_string(&reg.partition_keys)?,
                        reg.description,
                        serde_json::to_string(&parameters)?,
                        now,
                    ],
                )?;
                log::debug!("Updated catalog table {}.{}", reg.database, reg.name);
                Ok(TableStatus::Updated)
            }
        })
    }

    fn add_partition(
        &self,
        database: &str,
        table: &str,
        partition: &PartitionSpec,
    ) -> Result<bool, CatalogError> {
        let values = serde_json::to_string(&partition.values)?;
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO catalog_partitions
                 (database_name, table_name, partition_values, location, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![database, table, values, partition.location, now],
            )?;
            Ok(inserted > 0)
        })
    }

    fn table(&self, database: &str, name: &str) -> Result<Option<CatalogTable>, CatalogError> {
        self.with_conn(|conn| load_table(conn, database, name))
    }

    fn partitions(&self, database: &str, table: &str) -> Result<Vec<PartitionSpec>, CatalogError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT partition_values, location FROM catalog_partitions
                 WHERE database_name = ?1 AND table_name = ?2
                 ORDER BY partition_values",
            )?;
            let rows = stmt.query_map(params![database, table], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?;

            let mut partitions = Vec::new();
            for row in rows {
                let (values, location) = row?;
                partitions.push(PartitionSpec {
                    values: serde_json::from_str(&values)?,
                    location,
                });
            }
            Ok(partitions)
        })
    }

    fn is_ingested(&self, ingestion_key: &str) -> Result<bool, CatalogError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT 1 FROM ingestion_ledger WHERE ingestion_key = ?1",
                    params![ingestion_key],
                    |_| Ok(()),
                )
                .optional()?
                .is_some())
        })
    }

    fn record_ingestion(&self, entry: &LedgerEntry) -> Result<(), CatalogError> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO ingestion_ledger
                 (ingestion_key, database_name, table_name, object_key, source_key, row_count, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.ingestion_key,
                    entry.database,
                    entry.table,
                    entry.object_key,
                    entry.source_key,
                    entry.rows as i64,
                    now,
                ],
            )?;
            Ok(())
        })
    }
}
