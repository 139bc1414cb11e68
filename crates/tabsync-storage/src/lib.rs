//! tabsync Storage Layer
//!
//! SQLite-backed persistence plus the two storage capabilities the sync
//! engine consumes: a flat key-value remote store and a local config store.

mod config_store;
mod database;
mod error;
mod migrations;
mod remote;

pub use config_store::{ConfigStore, SqliteConfigStore};
pub use database::{Database, Table};
pub use error::StorageError;
pub use remote::{RemoteChanges, RemoteStore, SqliteRemoteStore, StorageChange};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Flat key-value record as held by a remote store.
pub type Record = serde_json::Map<String, serde_json::Value>;
