//! Session data structure

use std::collections::HashSet;

use tabsync_tabs::Tab;

/// A versioned snapshot of a set of open tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Human-readable origin of the snapshot
    pub description: String,
    /// Version counter; `-1` means never initialized
    pub generation: i64,
    /// Milliseconds since the epoch of the last accepted change
    pub update_time: Option<i64>,
    /// Ordered tabs; `numtabs` is always `tabs.len()`
    pub tabs: Vec<Tab>,
}

impl Session {
    pub const UNINITIALIZED: i64 = -1;

    /// An uninitialized session, as the remote image starts out.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            generation: Self::UNINITIALIZED,
            update_time: None,
            tabs: Vec::new(),
        }
    }

    /// The local image at process start: never touched, so the first
    /// accepted refresh brings it to generation 1.
    pub fn local(description: impl Into<String>) -> Self {
        Self {
            generation: 0,
            ..Self::new(description)
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.generation >= 0
    }

    /// Initialized, timestamped, non-empty and every tab well formed.
    pub fn is_valid(&self) -> bool {
        self.is_initialized()
            && self.update_time.is_some()
            && !self.tabs.is_empty()
            && self.tabs.iter().all(Tab::is_well_formed)
    }

    pub fn numtabs(&self) -> usize {
        self.tabs.len()
    }

    /// Truncate, or pad with empty slots until the slot contents arrive.
    pub fn set_numtabs(&mut self, numtabs: usize) {
        if numtabs <= self.tabs.len() {
            self.tabs.truncate(numtabs);
        } else {
            self.tabs.resize(numtabs, Tab::placeholder("", -1));
        }
    }

    pub fn window_count(&self) -> usize {
        count_windows(&self.tabs)
    }

    pub fn touch(&mut self, now: i64) {
        self.generation += 1;
        self.update_time = Some(now);
    }

    /// Replace the tabs with a fresh query result. Returns whether the
    /// refresh was accepted (and the session touched): an unchanged browser
    /// leaves a valid session alone.
    pub fn accept_refresh(&mut self, tabs: Vec<Tab>, now: i64) -> bool {
        if self.is_valid() && self.tabs == tabs {
            return false;
        }
        self.tabs = tabs;
        self.touch(now);
        true
    }
}

pub(crate) fn count_windows(tabs: &[Tab]) -> usize {
    tabs.iter()
        .map(|t| t.window_id)
        .collect::<HashSet<_>>()
        .len()
}
