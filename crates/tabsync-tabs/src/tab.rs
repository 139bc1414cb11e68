//! Tab data structure
//!
//! Field names serialize in camelCase so a tab slot in the remote record reads
//! `{"url", "index", "id", "windowId", "active", "title"}`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to a tab by the tab provider.
///
/// Negative values mean "not assigned yet": a tab planned for creation, or a
/// slot whose contents have not arrived from the remote store.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(i64);

impl TabId {
    pub const UNASSIGNED: TabId = TabId(-1);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_assigned(self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the window grouping a tab belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(i64);

impl WindowId {
    pub const UNASSIGNED: WindowId = WindowId(-1);

    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Current URL
    pub url: String,
    /// Position within its window
    pub index: i64,
    pub id: TabId,
    pub window_id: WindowId,
    /// Whether this is the selected tab of its window
    pub active: bool,
    #[serde(default)]
    pub title: String,
}

impl Tab {
    /// A slot reserved for a tab that does not exist yet.
    pub fn placeholder(url: impl Into<String>, index: i64) -> Self {
        Self {
            url: url.into(),
            index,
            id: TabId::UNASSIGNED,
            window_id: WindowId::UNASSIGNED,
            active: false,
            title: String::new(),
        }
    }

    /// Non-negative index and an assigned id.
    pub fn is_well_formed(&self) -> bool {
        self.index >= 0 && self.id.is_assigned()
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}
