//! Session comparison
//!
//! Comparisons run from the most specific level up and stop at the first
//! major finding. A result carries at most one difference, either major
//! (content: counts, windows, URLs) or minor (cosmetic: the active tab).

use std::cmp::Ordering;

use tabsync_tabs::Tab;

use crate::session::{count_windows, Session};

pub const LOCAL_NOT_INITIALIZED: &str = "Local browser not initialized yet";
pub const NO_SAVED_SESSION: &str = "No saved session found";
pub const NO_SAVED_TABS: &str = "No saved tabs found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Difference {
    Major(String),
    Minor(String),
}

impl Difference {
    pub fn is_major(&self) -> bool {
        matches!(self, Difference::Major(_))
    }

    pub fn description(&self) -> &str {
        match self {
            Difference::Major(d) | Difference::Minor(d) => d,
        }
    }
}

/// Compare two tabs: URL mismatch is major, active mismatch is minor.
pub fn tab_diff(a: &Tab, b: &Tab) -> Option<Difference> {
    if a.url != b.url {
        Some(Difference::Major("different URLs".to_string()))
    } else if a.active != b.active {
        Some(Difference::Minor("a different active tab".to_string()))
    } else {
        None
    }
}

/// Counts are always phrased from `first`'s side: "2 more tabs" means
/// `first` holds two tabs that `second` does not.
fn count_difference(first: usize, second: usize, noun: &str) -> Option<Difference> {
    let direction = match first.cmp(&second) {
        Ordering::Equal => return None,
        Ordering::Greater => "more",
        Ordering::Less => "fewer",
    };
    Some(Difference::Major(format!(
        "{} {direction} {noun}",
        first.abs_diff(second)
    )))
}

pub fn tabset_diff(first: &[Tab], second: &[Tab]) -> Option<Difference> {
    if let Some(diff) = count_difference(first.len(), second.len(), "tabs") {
        return Some(diff);
    }
    if let Some(diff) = count_difference(count_windows(first), count_windows(second), "windows")
    {
        return Some(diff);
    }

    let mut first_minor = None;
    for (position, (a, b)) in first.iter().zip(second).enumerate() {
        match tab_diff(a, b) {
            Some(Difference::Major(d)) => {
                return Some(Difference::Major(format!("tab {position} has {d}")));
            }
            Some(Difference::Minor(d)) if first_minor.is_none() => {
                first_minor = Some(Difference::Minor(format!("tab {position} has {d}")));
            }
            _ => {}
        }
    }

    first_minor
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiff {
    pub difference: Option<Difference>,
    /// The difference stems from missing or unusable data
    pub err: bool,
}

impl SessionDiff {
    fn major(description: &str, err: bool) -> Self {
        Self {
            difference: Some(Difference::Major(description.to_string())),
            err,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.difference.is_none()
    }

    pub fn major_description(&self) -> Option<&str> {
        match &self.difference {
            Some(Difference::Major(d)) => Some(d),
            _ => None,
        }
    }

    pub fn minor_description(&self) -> Option<&str> {
        match &self.difference {
            Some(Difference::Minor(d)) => Some(d),
            _ => None,
        }
    }
}

/// Compare the local and remote images.
///
/// Mutates both sides: an unusable side has its generation reset to
/// uninitialized, a difference found between equal generations bumps the
/// local one, and identical content aligns generations and update times.
pub fn session_diff(local: &mut Session, remote: &mut Session) -> SessionDiff {
    if local.generation < 0 || local.tabs.is_empty() {
        local.generation = Session::UNINITIALIZED;
        return SessionDiff::major(LOCAL_NOT_INITIALIZED, true);
    }
    if remote.generation < 0 {
        return SessionDiff::major(NO_SAVED_SESSION, true);
    }
    if remote.tabs.is_empty() {
        remote.generation = Session::UNINITIALIZED;
        return SessionDiff::major(NO_SAVED_TABS, false);
    }

    if let Some(difference) = tabset_diff(&local.tabs, &remote.tabs) {
        if local.generation == remote.generation {
            local.generation += 1;
            tracing::debug!(
                generation = local.generation,
                "Bumped local generation to break tie"
            );
        }
        return SessionDiff {
            difference: Some(difference),
            err: false,
        };
    }

    if local.generation != remote.generation {
        tracing::debug!(
            from = local.generation,
            to = remote.generation,
            "Aligned local generation with identical remote"
        );
        local.generation = remote.generation;
    }
    let latest = local.update_time.max(remote.update_time);
    local.update_time = latest;
    remote.update_time = latest;

    SessionDiff::default()
}
