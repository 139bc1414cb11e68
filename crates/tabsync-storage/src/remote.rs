//! Remote key-value store capability
//!
//! The remote side of a sync is any store that can hold a flat map of JSON
//! values. Nested arrays are not assumed to be supported; the session codec
//! flattens tabs into one key per slot.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::database::{Database, Table};
use crate::{Record, Result};

/// A single externally-applied change, as reported by the remote store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageChange {
    /// New value for the key; `None` when the key was removed.
    pub new_value: Option<serde_json::Value>,
}

/// Change notification payload: key to change.
pub type RemoteChanges = BTreeMap<String, StorageChange>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every key currently held by the store.
    async fn get_all(&self) -> Result<Record>;

    /// Write every key of `record`, leaving keys not in `record` untouched.
    async fn set_all(&self, record: Record) -> Result<()>;

    /// Remove the given keys. Unknown keys are ignored.
    async fn remove(&self, keys: Vec<String>) -> Result<()>;
}

/// Remote store persisted in the `remote_records` table.
///
/// Useful when the "remote" is a shared file synchronised by some other
/// means (a network mount, a file sync client).
pub struct SqliteRemoteStore {
    db: Database,
}

impl SqliteRemoteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RemoteStore for SqliteRemoteStore {
    async fn get_all(&self) -> Result<Record> {
        self.db.load_all(Table::RemoteRecords)
    }

    async fn set_all(&self, record: Record) -> Result<()> {
        let written = self.db.store_all(Table::RemoteRecords, &record)?;
        tracing::debug!(keys = written, "Wrote remote record");
        Ok(())
    }

    async fn remove(&self, keys: Vec<String>) -> Result<()> {
        self.db.delete_keys(Table::RemoteRecords, &keys)?;
        tracing::debug!(keys = ?keys, "Removed remote keys");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = SqliteRemoteStore::new(Database::open_in_memory().unwrap());

        let mut record = Record::new();
        record.insert("generation".to_string(), json!(3));
        record.insert("numtabs".to_string(), json!(1));
        record.insert(
            "Tab_0".to_string(),
            json!({"url": "https://a.example", "index": 0}),
        );
        store.set_all(record.clone()).await.unwrap();

        assert_eq!(store.get_all().await.unwrap(), record);

        store
            .remove(vec!["Tab_0".to_string(), "missing".to_string()])
            .await
            .unwrap();
        let after = store.get_all().await.unwrap();
        assert_eq!(after.len(), 2);
        assert!(!after.contains_key("Tab_0"));
    }

    #[tokio::test]
    async fn test_set_all_keeps_unrelated_keys() {
        let store = SqliteRemoteStore::new(Database::open_in_memory().unwrap());

        let mut first = Record::new();
        first.insert("Tab_5".to_string(), json!({"url": "x"}));
        store.set_all(first).await.unwrap();

        let mut second = Record::new();
        second.insert("numtabs".to_string(), json!(0));
        store.set_all(second).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert!(all.contains_key("Tab_5"));
        assert_eq!(all["numtabs"], json!(0));
    }
}
