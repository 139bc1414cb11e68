//! Reconciliation decision table
//!
//! Kept free of any I/O so the controller only has to gather the facts and
//! carry out the verdict.

use crate::options::SyncMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// One side has no usable baseline yet; wait for the next event.
    Defer,
    Nothing,
    Push,
    Pull,
    /// The remote session is unusable: treat the local one as the saved
    /// baseline and decide again with local as newer.
    AdoptLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub mode: SyncMode,
    /// The local session was captured exactly once so far.
    pub first_time: bool,
    pub local_is_newer: bool,
    pub has_difference: bool,
    pub local_initialized: bool,
    pub remote_initialized: bool,
    pub local_valid: bool,
    pub remote_valid: bool,
}

/// Which side wins when the caller did not say. Local changes only count
/// as newer in AUTOSAVE once the startup pull had its chance.
pub fn infer_local_is_newer(
    mode: SyncMode,
    first_time: bool,
    local_generation: i64,
    remote_generation: i64,
) -> bool {
    if mode == SyncMode::AutoSave && !first_time {
        return true;
    }
    local_generation >= remote_generation
}

pub fn decide(facts: &Facts) -> Action {
    if !facts.local_initialized || !facts.remote_initialized || !facts.local_valid {
        return Action::Defer;
    }
    if !facts.has_difference {
        return Action::Nothing;
    }

    if facts.local_is_newer {
        let pushes = matches!(facts.mode, SyncMode::AutoSync | SyncMode::AutoSave);
        if pushes && !facts.first_time {
            return Action::Push;
        }
        return Action::Nothing;
    }

    if !facts.remote_valid {
        return Action::AdoptLocal;
    }

    let pulls = match facts.mode {
        SyncMode::AutoSync => true,
        SyncMode::AutoStart | SyncMode::AutoSave => facts.first_time,
        SyncMode::Manual => false,
    };
    if pulls {
        Action::Pull
    } else {
        Action::Nothing
    }
}
