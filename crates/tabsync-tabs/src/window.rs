//! Window affinity matching
//!
//! Pairs the windows of one tab collection with the windows of another so
//! tabs can be moved into the window that most resembles their old grouping.
//! The pairing is greedy: highest scoring pairs first, each window used at
//! most once. It is not an optimal assignment.

use std::collections::HashSet;

use crate::tab::{Tab, WindowId};

const URL_POINTS: u32 = 5;
const INDEX_POINTS: u32 = 3;
const ACTIVE_POINTS: u32 = 1;

/// The tabs of one window, in collection order.
#[derive(Debug, Clone)]
pub struct WindowGroup<'a> {
    pub window_id: WindowId,
    pub tabs: Vec<&'a Tab>,
}

/// Partition `tabs` by window, keeping windows in order of first appearance.
/// Tabs without an assigned id are skipped.
pub fn group_by_window(tabs: &[Tab]) -> Vec<WindowGroup<'_>> {
    let mut groups: Vec<WindowGroup<'_>> = Vec::new();

    for tab in tabs.iter().filter(|t| t.id.is_assigned()) {
        match groups.iter_mut().find(|g| g.window_id == tab.window_id) {
            Some(group) => group.tabs.push(tab),
            None => groups.push(WindowGroup {
                window_id: tab.window_id,
                tabs: vec![tab],
            }),
        }
    }

    groups
}

/// Sum over every same-URL tab pair: 5 for the URL, 3 more for a matching
/// index, 1 more on top of that for a matching active flag.
pub fn affinity(a: &[&Tab], b: &[&Tab]) -> u32 {
    let mut score = 0;
    for left in a {
        for right in b {
            if left.url != right.url {
                continue;
            }
            score += URL_POINTS;
            if left.index == right.index {
                score += INDEX_POINTS;
                if left.active == right.active {
                    score += ACTIVE_POINTS;
                }
            }
        }
    }
    score
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMatch {
    pub source: WindowId,
    pub target: WindowId,
    pub score: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowAssignment {
    /// Accepted pairs, in acceptance order.
    pub matches: Vec<WindowMatch>,
    /// Target windows that need a new window on the source side.
    pub unmatched_targets: Vec<WindowId>,
}

impl WindowAssignment {
    pub fn source_for(&self, target: WindowId) -> Option<WindowId> {
        self.matches
            .iter()
            .find(|m| m.target == target)
            .map(|m| m.source)
    }
}

pub fn match_windows(source: &[Tab], target: &[Tab]) -> WindowAssignment {
    let source_groups = group_by_window(source);
    let target_groups = group_by_window(target);

    let mut candidates: Vec<WindowMatch> =
        Vec::with_capacity(source_groups.len() * target_groups.len());
    for s in &source_groups {
        for t in &target_groups {
            candidates.push(WindowMatch {
                source: s.window_id,
                target: t.window_id,
                score: affinity(&s.tabs, &t.tabs),
            });
        }
    }

    // Stable sort: equal scores keep encounter order
    candidates.sort_by(|a, b| b.score.cmp(&a.score));

    let mut used_sources = HashSet::new();
    let mut used_targets = HashSet::new();
    let mut matches = Vec::new();

    for candidate in candidates {
        if used_sources.contains(&candidate.source) || used_targets.contains(&candidate.target) {
            continue;
        }
        used_sources.insert(candidate.source);
        used_targets.insert(candidate.target);
        matches.push(candidate);
    }

    let unmatched_targets: Vec<WindowId> = target_groups
        .iter()
        .map(|g| g.window_id)
        .filter(|w| !used_targets.contains(w))
        .collect();

    tracing::debug!(
        matched = matches.len(),
        unmatched = unmatched_targets.len(),
        "Matched windows"
    );

    WindowAssignment {
        matches,
        unmatched_targets,
    }
}
