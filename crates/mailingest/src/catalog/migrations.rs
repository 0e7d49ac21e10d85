//! Catalog schema migrations.
//!
//! Applied versions are tracked in `_migrations`; pending ones run in order.

use rusqlite::Connection;

use crate::error::CatalogError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create_catalog_tables",
        sql: include_str!("sql/001_create_catalog_tables.sql"),
    },
    Migration {
        version: 2,
        description: "create_catalog_partitions",
        sql: include_str!("sql/002_create_catalog_partitions.sql"),
    },
    Migration {
        version: 3,
        description: "create_ingestion_ledger",
        sql: include_str!("sql/003_create_ingestion_ledger.sql"),
    },
];

pub fn run_all(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |r| r.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        log::info!(
            "Running catalog migration v{}: {}",
            migration.version,
            migration.description
        );

        conn.execute_batch(migration.sql)
            .map_err(|e| CatalogError::Migration {
                version: migration.version,
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
