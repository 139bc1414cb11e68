//! tabsync Tabs
//!
//! The tab model shared by both replicas, the capability interface to the
//! live browser, and the window affinity matcher used to rehome tabs.

mod error;
mod provider;
mod tab;
pub mod window;

pub use error::TabError;
pub use provider::{MoveProperties, TabEvent, TabProvider, TabSeed};
pub use tab::{Tab, TabId, WindowId};

pub type Result<T> = std::result::Result<T, TabError>;
