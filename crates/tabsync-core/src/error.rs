//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tabsync_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] tabsync_tabs::TabError),

    #[error("Session error: {0}")]
    Session(#[from] tabsync_session::SessionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported sync mode: {0}")]
    UnsupportedMode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sync controller not initialized")]
    NotInitialized,
}

// Directory creation is the only io the core does itself
impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
