//! Status reporting for the control surface

use serde::Serialize;
use tabsync_session::SessionDiff;

use crate::options::SyncOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Ok,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: StatusLevel,
    pub message: String,
}

impl SyncStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            state: StatusLevel::Ok,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            state: StatusLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            state: StatusLevel::Error,
            message: message.into(),
        }
    }

    /// ERROR for data problems, WARN for content differences, OK with a
    /// message for cosmetic ones, plain OK otherwise.
    pub fn from_diff(diff: &SessionDiff) -> Self {
        if let Some(major) = diff.major_description() {
            if diff.err {
                return Self::error(major);
            }
            return Self::warn(major);
        }
        match diff.minor_description() {
            Some(minor) => Self::ok(minor),
            None => Self::ok(""),
        }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::ok("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub options: SyncOptions,
    pub sync: SyncStatus,
    pub remote_timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsync_session::Difference;

    #[test]
    fn test_levels_from_diff() {
        let err = SessionDiff {
            difference: Some(Difference::Major("No saved session found".to_string())),
            err: true,
        };
        assert_eq!(SyncStatus::from_diff(&err).state, StatusLevel::Error);

        let major = SessionDiff {
            difference: Some(Difference::Major("1 more tabs".to_string())),
            err: false,
        };
        assert_eq!(SyncStatus::from_diff(&major), SyncStatus::warn("1 more tabs"));

        let minor = SessionDiff {
            difference: Some(Difference::Minor("tab 0 has a different active tab".to_string())),
            err: false,
        };
        assert_eq!(
            SyncStatus::from_diff(&minor),
            SyncStatus::ok("tab 0 has a different active tab")
        );

        assert_eq!(SyncStatus::from_diff(&SessionDiff::default()), SyncStatus::ok(""));
    }

    #[test]
    fn test_report_shape() {
        let report = StatusReport {
            options: SyncOptions::default(),
            sync: SyncStatus::warn("1 more tabs"),
            remote_timestamp: Some(42),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "options": {"mode": "manual", "debug": false},
                "sync": {"state": "warn", "message": "1 more tabs"},
                "remoteTimestamp": 42
            })
        );
    }
}
