use crate::models::theme::ThemeState;
use serde::{Deserialize, Serialize};

/// Source label used for corrections made by persistence mode itself.
pub const PERSISTENCE_SOURCE: &str = "persistence enforcement";

/// Sentinel returned when no candidate process could be blamed.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Timestamp format for the `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A change record as read back from the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: String,
    pub theme_mode: String,
    pub source_process: String,
    pub details: String,
    /// Assigned by the store on insert.
    pub created_at: String,
}

/// A change record about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub timestamp: String,
    pub theme_mode: String,
    pub source_process: String,
    pub details: String,
}

impl NewLogEntry {
    /// Build the record for an observed `old -> new` transition.
    ///
    /// Every field except the timestamp is a pure function of the pair and the
    /// source label.
    pub fn for_transition(old: &ThemeState, new: &ThemeState, source_process: &str) -> Self {
        Self {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            theme_mode: new.mode().label().to_string(),
            source_process: source_process.to_string(),
            details: old.describe_transition(new),
        }
    }
}
