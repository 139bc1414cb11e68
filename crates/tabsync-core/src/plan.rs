//! Restore planning
//!
//! Pure functions that turn "make the local tabs look like the remote tabs"
//! into plain step lists, one list per phase. They work on an in-memory copy
//! of the local tabs which they keep aligned slot-for-slot with the remote
//! tabs; the controller executes each list through the phase sequencer and
//! writes the results back into that copy before planning the next phase.

use std::collections::HashMap;

use tabsync_session::tab_diff;
use tabsync_tabs::window::{match_windows, WindowAssignment};
use tabsync_tabs::{MoveProperties, Tab, TabId, TabSeed, WindowId};

/// Create a tab for `slot`, which currently holds a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStep {
    pub slot: usize,
    pub seed: TabSeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveStep {
    pub slot: usize,
    pub id: TabId,
    pub props: MoveProperties,
}

/// Open a window for a remote window that has no local counterpart,
/// seeded with the tab in `seed_slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewWindowStep {
    pub target: WindowId,
    pub seed_slot: usize,
    pub seed: TabId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateStep {
    pub id: TabId,
    pub active: bool,
}

fn matches_content(local: &Tab, remote: &Tab) -> bool {
    !tab_diff(local, remote).is_some_and(|d| d.is_major())
}

/// Walk the remote tabs by position. A local tab at the same position with
/// no major difference stays; otherwise the first matching tab further down
/// is pulled up, and failing that a placeholder is inserted and a creation
/// planned. Afterwards `local[..remote.len()]` lines up with `remote`.
pub fn plan_alignment(local: &mut Vec<Tab>, remote: &[Tab]) -> Vec<CreateStep> {
    let mut creates = Vec::new();

    for (position, wanted) in remote.iter().enumerate() {
        if local
            .get(position)
            .is_some_and(|tab| matches_content(tab, wanted))
        {
            continue;
        }

        let found = (position + 1..local.len()).find(|&j| matches_content(&local[j], wanted));
        match found {
            Some(j) => {
                let tab = local.remove(j);
                local.insert(position, tab);
            }
            None => {
                local.insert(position, Tab::placeholder(wanted.url.clone(), wanted.index));
                creates.push(CreateStep {
                    slot: position,
                    seed: TabSeed {
                        url: wanted.url.clone(),
                        index: wanted.index,
                    },
                });
            }
        }
    }

    creates
}

/// Drop every local tab beyond the remote count; returns the ones that
/// exist in the browser and must be removed.
pub fn plan_deletions(local: &mut Vec<Tab>, remote_len: usize) -> Vec<TabId> {
    if local.len() <= remote_len {
        return Vec::new();
    }
    local
        .split_off(remote_len)
        .into_iter()
        .map(|t| t.id)
        .filter(|id| id.is_assigned())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowPlan {
    pub assignment: WindowAssignment,
    pub new_windows: Vec<NewWindowStep>,
}

impl WindowPlan {
    /// Remote window to local window, for the matched windows.
    pub fn matched_targets(&self) -> HashMap<WindowId, WindowId> {
        self.assignment
            .matches
            .iter()
            .map(|m| (m.target, m.source))
            .collect()
    }
}

pub fn plan_windows(local: &[Tab], remote: &[Tab]) -> WindowPlan {
    let assignment = match_windows(local, remote);

    let new_windows = assignment
        .unmatched_targets
        .iter()
        .filter_map(|&target| {
            let seed_slot = remote
                .iter()
                .zip(local)
                .position(|(r, l)| r.window_id == target && l.id.is_assigned())?;
            Some(NewWindowStep {
                target,
                seed_slot,
                seed: local[seed_slot].id,
            })
        })
        .collect();

    WindowPlan {
        assignment,
        new_windows,
    }
}

/// Moves for tabs sitting in the wrong window. `targets` maps remote windows
/// to local ones.
pub fn plan_window_moves(
    local: &[Tab],
    remote: &[Tab],
    targets: &HashMap<WindowId, WindowId>,
) -> Vec<MoveStep> {
    local
        .iter()
        .zip(remote)
        .enumerate()
        .filter(|(_, (l, _))| l.id.is_assigned())
        .filter_map(|(slot, (l, r))| {
            let window = *targets.get(&r.window_id)?;
            (l.window_id != window).then_some(MoveStep {
                slot,
                id: l.id,
                props: MoveProperties {
                    index: r.index,
                    window_id: Some(window),
                },
            })
        })
        .collect()
}

/// Every tab to its remote index, lowest index first.
pub fn plan_index_moves(local: &[Tab], remote: &[Tab]) -> Vec<MoveStep> {
    let mut moves: Vec<MoveStep> = local
        .iter()
        .zip(remote)
        .enumerate()
        .filter(|(_, (l, _))| l.id.is_assigned())
        .map(|(slot, (l, r))| MoveStep {
            slot,
            id: l.id,
            props: MoveProperties {
                index: r.index,
                window_id: None,
            },
        })
        .collect();
    moves.sort_by_key(|m| m.props.index);
    moves
}

/// Every remote-active tab is activated, whatever the model says: creating
/// tabs and windows moves focus, so the model's flags are not trusted.
/// Deactivations are only planned where the model shows a tab as active.
pub fn plan_activation(local: &[Tab], remote: &[Tab]) -> Vec<ActivateStep> {
    local
        .iter()
        .zip(remote)
        .filter(|(l, r)| l.id.is_assigned() && (r.active || l.active))
        .map(|(l, r)| ActivateStep {
            id: l.id,
            active: r.active,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tab(id: i64, window: i64, index: i64, url: &str, active: bool) -> Tab {
        Tab {
            url: url.to_string(),
            index,
            id: TabId::new(id),
            window_id: WindowId::new(window),
            active,
            title: String::new(),
        }
    }

    fn urls(tabs: &[Tab]) -> Vec<&str> {
        tabs.iter().map(|t| t.url.as_str()).collect()
    }

    #[test]
    fn test_alignment_of_identical_lists_is_empty() {
        let remote = vec![tab(50, 9, 0, "a", true), tab(51, 9, 1, "b", false)];
        let mut local = vec![tab(1, 1, 0, "a", false), tab(2, 1, 1, "b", true)];

        assert!(plan_alignment(&mut local, &remote).is_empty());
        assert_eq!(urls(&local), vec!["a", "b"]);
    }

    #[test]
    fn test_alignment_relocates_then_creates() {
        let remote = vec![
            tab(50, 9, 0, "c", true),
            tab(51, 9, 1, "a", false),
            tab(52, 9, 2, "x", false),
        ];
        let mut local = vec![
            tab(1, 1, 0, "a", true),
            tab(2, 1, 1, "b", false),
            tab(3, 1, 2, "c", false),
        ];

        let creates = plan_alignment(&mut local, &remote);

        assert_eq!(
            creates,
            vec![CreateStep {
                slot: 2,
                seed: TabSeed {
                    url: "x".to_string(),
                    index: 2
                }
            }]
        );
        assert_eq!(urls(&local), vec!["c", "a", "x", "b"]);
        assert!(!local[2].id.is_assigned());

        let removed = plan_deletions(&mut local, remote.len());
        assert_eq!(removed, vec![TabId::new(2)]);
        assert_eq!(urls(&local), vec!["c", "a", "x"]);
    }

    #[test]
    fn test_alignment_into_empty_browser() {
        let remote = vec![tab(50, 9, 0, "a", true), tab(51, 9, 1, "b", false)];
        let mut local = Vec::new();

        let creates = plan_alignment(&mut local, &remote);
        assert_eq!(creates.len(), 2);
        assert_eq!(creates[1].slot, 1);
        assert_eq!(urls(&local), vec!["a", "b"]);
        assert!(plan_deletions(&mut local, remote.len()).is_empty());
    }

    #[test]
    fn test_duplicate_urls_consume_one_local_tab_each() {
        let remote = vec![tab(50, 9, 0, "a", true), tab(51, 9, 1, "a", false)];
        let mut local = vec![tab(1, 1, 0, "a", true)];

        let creates = plan_alignment(&mut local, &remote);
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].slot, 1);
    }

    #[test]
    fn test_window_plan_creates_missing_windows() {
        let local = vec![
            tab(1, 1, 0, "a", true),
            tab(2, 1, 1, "b", false),
            tab(3, 1, 2, "c", false),
        ];
        let remote = vec![
            tab(50, 100, 0, "a", true),
            tab(51, 100, 1, "b", false),
            tab(52, 200, 0, "c", true),
        ];

        let plan = plan_windows(&local, &remote);
        assert_eq!(
            plan.matched_targets().get(&WindowId::new(100)),
            Some(&WindowId::new(1))
        );
        assert_eq!(
            plan.new_windows,
            vec![NewWindowStep {
                target: WindowId::new(200),
                seed_slot: 2,
                seed: TabId::new(3)
            }]
        );
    }

    #[test]
    fn test_window_moves_only_for_misplaced_tabs() {
        let local = vec![
            tab(1, 1, 0, "a", true),
            tab(2, 2, 0, "b", true),
            tab(3, 1, 1, "c", false),
        ];
        let remote = vec![
            tab(50, 100, 0, "a", true),
            tab(51, 100, 1, "b", false),
            tab(52, 200, 0, "c", true),
        ];
        let targets = HashMap::from([
            (WindowId::new(100), WindowId::new(1)),
            (WindowId::new(200), WindowId::new(2)),
        ]);

        let moves = plan_window_moves(&local, &remote, &targets);
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].id, TabId::new(2));
        assert_eq!(moves[0].props.window_id, Some(WindowId::new(1)));
        assert_eq!(moves[0].props.index, 1);
        assert_eq!(moves[1].id, TabId::new(3));
        assert_eq!(moves[1].props.window_id, Some(WindowId::new(2)));
    }

    #[test]
    fn test_index_moves_sorted_and_skip_placeholders() {
        let local = vec![
            tab(1, 1, 5, "a", true),
            Tab::placeholder("b", 0),
            tab(3, 1, 0, "c", false),
        ];
        let remote = vec![
            tab(50, 100, 2, "a", true),
            tab(51, 100, 0, "b", false),
            tab(52, 100, 1, "c", false),
        ];

        let moves = plan_index_moves(&local, &remote);
        let order: Vec<(TabId, i64)> = moves.iter().map(|m| (m.id, m.props.index)).collect();
        assert_eq!(order, vec![(TabId::new(3), 1), (TabId::new(1), 2)]);
        assert!(moves.iter().all(|m| m.props.window_id.is_none()));
    }

    #[test]
    fn test_activation_always_targets_remote_active_tabs() {
        let local = vec![
            tab(1, 1, 0, "a", false),
            tab(2, 1, 1, "b", true),
            tab(3, 1, 2, "c", true),
            tab(4, 1, 3, "d", false),
        ];
        let remote = vec![
            tab(50, 9, 0, "a", true),
            tab(51, 9, 1, "b", true),
            tab(52, 9, 2, "c", false),
            tab(53, 9, 3, "d", false),
        ];

        assert_eq!(
            plan_activation(&local, &remote),
            vec![
                ActivateStep {
                    id: TabId::new(1),
                    active: true
                },
                ActivateStep {
                    id: TabId::new(2),
                    active: true
                },
                ActivateStep {
                    id: TabId::new(3),
                    active: false
                },
            ]
        );
    }

    #[test]
    fn test_activation_skips_placeholders() {
        let local = vec![tab(1, 1, 0, "a", false), Tab::placeholder("b", 1)];
        let remote = vec![tab(50, 9, 0, "a", false), tab(51, 9, 1, "b", true)];
        assert!(plan_activation(&local, &remote).is_empty());
    }
}
