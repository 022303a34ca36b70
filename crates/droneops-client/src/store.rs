//! Durable local store.
//!
//! One JSON record-set per entity kind plus the session markers and the
//! catalog document, all rows in a single SQLite key/value table. Absence
//! of a key reads as an empty set. Single-writer by assumption: exactly one
//! logical session operates against the store at a time.

use droneops_core::{EntityKind, Error, Result};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use tracing::info;

#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

fn storage_err(err: sqlx::Error) -> Error {
    Error::Generic(format!("Local store failure: {err}"))
}

impl LocalStore {
    /// Open (creating if needed) the store at `path`. Use `":memory:"` for
    /// an ephemeral store in tests.
    pub async fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| Error::Generic(format!("Local store failure: {err}")))?;
            }
        }

        let url = format!("sqlite:{path}?mode=rwc");
        info!("Opening local store at {path}");

        // One connection is enough for a single-session client and keeps
        // ":memory:" stores coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .map_err(storage_err)?;

        sqlx::query(include_str!("../migrations/001_init.sql"))
            .execute(&pool)
            .await
            .map_err(storage_err)?;

        Ok(Self { pool })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|r| r.try_get::<String, _>("value").map_err(storage_err))
            .transpose()
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// All records of `kind`, in storage order.
    pub async fn read_records(&self, kind: EntityKind) -> Result<Vec<Value>> {
        match self.get(kind.storage_key()).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the record-set of `kind` wholesale.
    pub async fn write_records(&self, kind: EntityKind, records: &[Value]) -> Result<()> {
        self.put(kind.storage_key(), &serde_json::to_string(records)?)
            .await
    }
}
