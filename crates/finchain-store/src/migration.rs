//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use finchain_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
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

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per mined block
        CREATE TABLE blocks (
            id TEXT PRIMARY KEY,              -- 16 bytes, hex
            user_id TEXT NOT NULL,            -- chain owner
            transaction_id TEXT UNIQUE,       -- NULL only for genesis
            idx INTEGER NOT NULL,             -- zero-based chain position
            timestamp INTEGER NOT NULL,       -- creation time (Unix ms)
            data_hash TEXT NOT NULL,          -- digest of plaintext payload
            encrypted_data TEXT,              -- NULL for genesis
            previous_hash TEXT NOT NULL,      -- "0" for genesis
            nonce INTEGER NOT NULL,           -- proof-of-work nonce
            hash TEXT NOT NULL,               -- block hash
            inserted_at INTEGER NOT NULL,     -- local time of insertion

            UNIQUE(user_id, idx)
        );

        CREATE INDEX idx_blocks_user_idx ON blocks(user_id, idx);
        CREATE INDEX idx_blocks_timestamp ON blocks(timestamp);
        "#,
    )?;

    Ok(())
}
