//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the local database (options, and the remote record when the
    /// SQLite remote store is used)
    pub database_path: PathBuf,
    /// Description written into every pushed session
    pub description: String,
    /// Debounce delay for local refreshes
    pub refresh_delay_ms: u64,
    /// Delay used while establishing a baseline or after a window closes
    pub urgent_refresh_delay_ms: u64,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string());

        Self {
            database_path: data_dir.join("tabsync.db"),
            description: format!("tabsync@{host}"),
            refresh_delay_ms: 5_000,
            urgent_refresh_delay_ms: 500,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("tabsync"))
            .unwrap_or_else(|| PathBuf::from(".tabsync"))
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn urgent_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.urgent_refresh_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
