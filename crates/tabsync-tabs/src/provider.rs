//! Tab provider capability
//!
//! The live browser is only reachable through this trait. Every mutation is
//! asynchronous and identifiers for new tabs and windows are only known once
//! the provider answers.

use async_trait::async_trait;

use crate::tab::{Tab, TabId, WindowId};
use crate::Result;

/// The fields a creation request is allowed to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSeed {
    pub url: String,
    pub index: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveProperties {
    pub index: i64,
    /// Move into another window; `None` keeps the current one.
    pub window_id: Option<WindowId>,
}

#[async_trait]
pub trait TabProvider: Send + Sync {
    /// Every open tab, ordered by window then by index.
    async fn query_all(&self) -> Result<Vec<Tab>>;

    async fn create(&self, seed: TabSeed) -> Result<Tab>;

    async fn remove(&self, id: TabId) -> Result<()>;

    async fn move_tab(&self, id: TabId, props: MoveProperties) -> Result<()>;

    async fn update(&self, id: TabId, active: bool) -> Result<()>;

    /// Open a new window holding `seed` and return the window's id.
    async fn create_window(&self, seed: TabId) -> Result<WindowId>;
}

/// Browser change notifications. Each one is only a hint that the local
/// session should be refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabEvent {
    Created(TabId),
    Updated(TabId),
    Moved(TabId),
    Activated(TabId),
    Highlighted(WindowId),
    Detached(TabId),
    Attached(TabId),
    Removed {
        tab_id: TabId,
        window_closing: bool,
    },
    Replaced {
        added: TabId,
        removed: TabId,
    },
}

impl TabEvent {
    /// Whether the refresh this event triggers should use the short delay.
    pub fn is_urgent(&self) -> bool {
        matches!(
            self,
            TabEvent::Removed {
                window_closing: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_window_close_is_urgent() {
        assert!(TabEvent::Removed {
            tab_id: TabId::new(1),
            window_closing: true
        }
        .is_urgent());
        assert!(!TabEvent::Removed {
            tab_id: TabId::new(1),
            window_closing: false
        }
        .is_urgent());
        assert!(!TabEvent::Created(TabId::new(2)).is_urgent());
    }
}
