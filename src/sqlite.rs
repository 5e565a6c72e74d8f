use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::error::StoreError;
use crate::storage::KeyValueStore;

pub fn default_database_path() -> Result<PathBuf> {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("Neither HOME nor USERPROFILE is set; pass --db explicitly")?;

    let path = PathBuf::from(home).join(".timeguard.db");
    info!(action = "resolve", component = "database_path", path = ?path, "Database path resolved");
    Ok(path)
}

/// SQLite-backed store holding settings and the access log in a `kv` table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let start_time = Instant::now();
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;

        info!(
            action = "open",
            component = "sqlite_store",
            path = ?path,
            duration_ms = start_time.elapsed().as_millis(),
            "Opened settings database"
        );
        Ok(store)
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, text],
        )?;
        Ok(())
    }
}
