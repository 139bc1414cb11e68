//! SQLite handle and the JSON key-value tables both stores sit on

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::migrations::run_migrations;
use crate::{Record, Result};

/// The key-value tables. Each row holds one key and a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Settings,
    RemoteRecords,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Settings => "settings",
            Table::RemoteRecords => "remote_records",
        }
    }
}

/// Shared SQLite handle; clones talk to the same connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;

        // WAL for concurrent readers
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.busy_timeout(Duration::from_secs(5))?;

        tracing::debug!(path = %path.as_ref().display(), "Opened sync database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// One value, `None` if the key is absent. A stored value that is not
    /// valid JSON is an error.
    pub fn get_value(&self, table: Table, key: &str) -> Result<Option<Value>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", table.name());
        let raw: Option<String> = self.with_connection(|conn| {
            Ok(conn.query_row(&sql, [key], |row| row.get(0)).optional()?)
        })?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Every row of `table`. Rows whose value does not parse come back as
    /// `null` so callers can still see (and prune) the key.
    pub fn load_all(&self, table: Table) -> Result<Record> {
        let sql = format!("SELECT key, value FROM {}", table.name());
        let rows: Vec<(String, String)> = self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        let mut record = Record::new();
        for (key, raw) in rows {
            let value = serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(table = table.name(), key = %key, error = %e, "Unparseable stored value");
                Value::Null
            });
            record.insert(key, value);
        }
        Ok(record)
    }

    /// Upsert every entry in one transaction.
    pub fn store_all<'a, I>(&self, table: Table, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a String, &'a Value)>,
    {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value, updated_at) VALUES (?1, ?2, ?3)",
            table.name()
        );
        let updated_at = Utc::now().to_rfc3339();

        self.transaction(|conn| {
            let mut written = 0;
            for (key, value) in entries {
                conn.execute(
                    &sql,
                    rusqlite::params![key, serde_json::to_string(value)?, updated_at],
                )?;
                written += 1;
            }
            Ok(written)
        })
    }

    pub fn delete_keys(&self, table: Table, keys: &[String]) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", table.name());
        self.transaction(|conn| {
            for key in keys {
                conn.execute(&sql, [key])?;
            }
            Ok(())
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
