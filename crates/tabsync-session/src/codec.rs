//! Flat record codec
//!
//! A remote key-value store cannot be trusted to hold nested arrays, so a
//! session is written as its scalar fields plus `numtabs` plus one
//! `Tab_<i>` key per slot. The `tabs` sequence itself never appears.
//!
//! Recognized keys (format v1): `description`, `generation`, `updateTime`,
//! `numtabs`, `Tab_<n>`. Anything else is obsolete and reported back so the
//! caller can prune it from the store.

use serde_json::Value;
use tabsync_storage::Record;
use tabsync_tabs::Tab;

use crate::session::Session;
use crate::Result;

pub const DESCRIPTION_KEY: &str = "description";
pub const GENERATION_KEY: &str = "generation";
pub const UPDATE_TIME_KEY: &str = "updateTime";
pub const NUMTABS_KEY: &str = "numtabs";
const TAB_KEY_PREFIX: &str = "Tab_";

/// Upper bound on `numtabs` accepted from a record.
pub const MAX_NUMTABS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Description,
    Generation,
    UpdateTime,
    NumTabs,
    Tab(usize),
}

impl Field {
    fn parse(key: &str) -> Option<Field> {
        match key {
            DESCRIPTION_KEY => Some(Field::Description),
            GENERATION_KEY => Some(Field::Generation),
            UPDATE_TIME_KEY => Some(Field::UpdateTime),
            NUMTABS_KEY => Some(Field::NumTabs),
            _ => {
                let slot: usize = key.strip_prefix(TAB_KEY_PREFIX)?.parse().ok()?;
                // "Tab_01" and "Tab_+1" would alias "Tab_1"
                (tab_key(slot) == key).then_some(Field::Tab(slot))
            }
        }
    }
}

pub fn tab_key(slot: usize) -> String {
    format!("{TAB_KEY_PREFIX}{slot}")
}

pub fn encode(session: &Session) -> Result<Record> {
    let mut record = Record::new();
    record.insert(
        DESCRIPTION_KEY.to_string(),
        Value::String(session.description.clone()),
    );
    record.insert(GENERATION_KEY.to_string(), Value::from(session.generation));
    if let Some(update_time) = session.update_time {
        record.insert(UPDATE_TIME_KEY.to_string(), Value::from(update_time));
    }
    record.insert(NUMTABS_KEY.to_string(), Value::from(session.numtabs()));

    for (slot, tab) in session.tabs.iter().enumerate() {
        record.insert(tab_key(slot), serde_json::to_value(tab)?);
    }

    Ok(record)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub session: Session,
    /// Keys that were present but not accepted.
    pub obsolete_keys: Vec<String>,
}

pub fn decode(record: &Record) -> Decoded {
    let mut session = Session::new("");
    let obsolete_keys = apply_updates(&mut session, record);
    Decoded {
        session,
        obsolete_keys,
    }
}

/// Apply one property update. Returns `false` when the key is unrecognized,
/// the value has the wrong shape, or the key names a tab slot at or beyond
/// `numtabs` (a slot that has since been trimmed).
pub fn apply_update(session: &mut Session, key: &str, value: &Value) -> bool {
    let Some(field) = Field::parse(key) else {
        return false;
    };

    match field {
        Field::Description => match value.as_str() {
            Some(description) => {
                session.description = description.to_string();
                true
            }
            None => false,
        },
        Field::Generation => match value.as_i64() {
            Some(generation) => {
                session.generation = generation;
                true
            }
            None => false,
        },
        Field::UpdateTime => {
            if value.is_null() {
                session.update_time = None;
                return true;
            }
            match value.as_i64() {
                Some(update_time) => {
                    session.update_time = Some(update_time);
                    true
                }
                None => false,
            }
        }
        Field::NumTabs => match value.as_u64() {
            Some(numtabs) if numtabs <= MAX_NUMTABS as u64 => {
                session.set_numtabs(numtabs as usize);
                true
            }
            Some(numtabs) => {
                tracing::warn!(numtabs, "Rejected oversized tab count");
                false
            }
            None => false,
        },
        Field::Tab(slot) => {
            if slot >= session.numtabs() {
                tracing::debug!(key = %key, numtabs = session.numtabs(), "Rejected stale tab slot");
                return false;
            }
            match serde_json::from_value::<Tab>(value.clone()) {
                Ok(tab) => {
                    session.tabs[slot] = tab;
                    true
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Malformed tab slot");
                    false
                }
            }
        }
    }
}

/// Apply a whole record, `numtabs` first so every tab slot is checked against
/// the final count. Returns the rejected keys.
pub fn apply_updates(session: &mut Session, record: &Record) -> Vec<String> {
    let mut obsolete = Vec::new();

    if let Some(numtabs) = record.get(NUMTABS_KEY) {
        if !apply_update(session, NUMTABS_KEY, numtabs) {
            obsolete.push(NUMTABS_KEY.to_string());
        }
    }

    for (key, value) in record {
        if key == NUMTABS_KEY {
            continue;
        }
        if !apply_update(session, key, value) {
            obsolete.push(key.clone());
        }
    }

    obsolete
}

/// Slot keys left behind when a session shrinks from `previous` to `current`
/// tabs.
pub fn stale_tab_keys(previous: usize, current: usize) -> Vec<String> {
    (current..previous).map(tab_key).collect()
}
