//! tabsync Session Management
//!
//! - A Session is a versioned snapshot of the open tabs
//! - Sessions travel to the remote store as a flat record (`codec`)
//! - Two sessions are compared with a severity-ranked diff (`diff`)

pub mod codec;
pub mod diff;
mod error;
mod session;

pub use diff::{session_diff, tab_diff, tabset_diff, Difference, SessionDiff};
pub use error::SessionError;
pub use session::Session;

pub type Result<T> = std::result::Result<T, SessionError>;
