//! User-facing sync options

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Result;

/// Key the options live under in the config store.
pub const OPTIONS_KEY: &str = "options";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Only explicit push/pull requests
    #[default]
    Manual,
    /// Pull the saved session once at startup
    AutoStart,
    /// Pull at startup, then push every local change
    AutoSave,
    /// Push local changes and pull remote ones
    AutoSync,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Manual => "manual",
            SyncMode::AutoStart => "autostart",
            SyncMode::AutoSave => "autosave",
            SyncMode::AutoSync => "autosync",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyncMode {
    type Err = CoreError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(SyncMode::Manual),
            "autostart" => Ok(SyncMode::AutoStart),
            "autosave" => Ok(SyncMode::AutoSave),
            "autosync" => Ok(SyncMode::AutoSync),
            _ => Err(CoreError::UnsupportedMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub mode: SyncMode,
    #[serde(default)]
    pub debug: bool,
}

/// A partial options change as sent by the control surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OptionsUpdate {
    pub mode: Option<String>,
    pub debug: Option<bool>,
}

impl SyncOptions {
    /// The options after `update`, or an error if the update names an
    /// unknown mode. `self` is never modified.
    pub fn merged(&self, update: &OptionsUpdate) -> Result<SyncOptions> {
        let mode = match update.mode.as_deref() {
            Some(raw) => raw.parse()?,
            None => self.mode,
        };

        Ok(SyncOptions {
            mode,
            debug: update.debug.unwrap_or(self.debug),
        })
    }
}
