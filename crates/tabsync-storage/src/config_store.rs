//! Local config store capability

use async_trait::async_trait;
use serde_json::Value;

use crate::database::{Database, Table};
use crate::Result;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Config store backed by the `settings` table.
pub struct SqliteConfigStore {
    db: Database,
}

impl SqliteConfigStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.db.get_value(Table::Settings, key)
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        self.db.store_all(Table::Settings, [(&key, &value)])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_options_round_trip() {
        let store = SqliteConfigStore::new(Database::open_in_memory().unwrap());
        assert!(store.get("options").await.unwrap().is_none());

        store
            .set("options", json!({"mode": "autosync", "debug": true}))
            .await
            .unwrap();

        let value = store.get("options").await.unwrap().unwrap();
        assert_eq!(value["mode"], "autosync");
        assert_eq!(value["debug"], true);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('options', '{not json', '')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let store = SqliteConfigStore::new(db);
        assert!(store.get("options").await.is_err());
    }
}
