//! Database schema migrations for SQLite.
//!
//! Versioned: each migration transforms the schema from version N to N+1.

use rusqlite::Connection;
use vellum_core::now_millis;

use crate::error::{Result, StorageError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StorageError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: blobs, transaction journal, chain tip.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Content-addressed blobs
        CREATE TABLE blobs (
            hash BLOB PRIMARY KEY,            -- 32 bytes, Blake3 of data
            data BLOB NOT NULL,
            size INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Submitted transactions
        CREATE TABLE transactions (
            txid BLOB PRIMARY KEY,            -- 32 bytes
            payload BLOB NOT NULL,
            submitted_at INTEGER NOT NULL,
            block_height INTEGER              -- NULL while pending
        );

        -- Single-row chain tip
        CREATE TABLE chain_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            height INTEGER NOT NULL
        );
        INSERT INTO chain_state (id, height) VALUES (1, 0);

        CREATE INDEX idx_transactions_pending ON transactions(block_height);
        "#,
    )?;

    Ok(())
}
