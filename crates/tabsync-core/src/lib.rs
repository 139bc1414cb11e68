//! tabsync Core
//!
//! The reconciliation engine: decides when the browser and the saved
//! session have drifted apart and drives one towards the other.

mod config;
mod controller;
mod decision;
mod error;
mod options;
pub mod phase;
pub mod plan;
mod restore;
mod status;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use controller::{Lifecycle, SyncController, SyncEvent};
pub use decision::{decide, infer_local_is_newer, Action, Facts};
pub use error::CoreError;
pub use options::{OptionsUpdate, SyncMode, SyncOptions, OPTIONS_KEY};
pub use phase::{PhaseSequencer, StepHandle, StepOutcome};
pub use status::{StatusLevel, StatusReport, SyncStatus};

// Re-export the building blocks hosts need to wire a controller up
pub use tabsync_session::{Difference, Session, SessionDiff};
pub use tabsync_storage::{
    ConfigStore, Database, RemoteChanges, RemoteStore, SqliteConfigStore, SqliteRemoteStore,
    StorageChange,
};
pub use tabsync_tabs::{Tab, TabEvent, TabId, TabProvider, WindowId};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Open (creating if needed) the database named by `config`.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(&config.database_path)?)
}

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
