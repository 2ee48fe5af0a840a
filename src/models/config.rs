use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User configuration from ThemeWatch Config.yaml
///
/// Contains the monitor cadence and a few presentation preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "ThemeWatch_Settings", default)]
    pub settings: MonitorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Delay between two polls of the appearance setting.
    #[serde(rename = "Poll Interval", default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay after a failed polling iteration.
    #[serde(rename = "Error Backoff", default = "default_error_backoff")]
    pub error_backoff_ms: u64,

    #[serde(
        rename = "Persistence Interval",
        default = "default_persistence_interval"
    )]
    pub persistence_interval_ms: u64,

    /// How long `stop` waits for a loop to wind down.
    #[serde(rename = "Stop Timeout", default = "default_stop_timeout")]
    pub stop_timeout_ms: u64,

    /// Bounded wait for hung windows when announcing a change.
    #[serde(rename = "Broadcast Timeout", default = "default_broadcast_timeout")]
    pub broadcast_timeout_ms: u64,

    /// Status/log refresh cadence of the presentation layer.
    #[serde(rename = "Refresh Interval", default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    #[serde(rename = "Log Limit", default = "default_log_limit")]
    pub log_limit: usize,

    #[serde(rename = "Export Limit", default = "default_export_limit")]
    pub export_limit: usize,

    /// Process names that are blamed for a change when found running.
    #[serde(
        rename = "Attribution Candidates",
        default = "default_attribution_candidates"
    )]
    pub attribution_candidates: Vec<String>,

    /// Empty means `<data dir>/logs.db`.
    #[serde(rename = "Database Path", default)]
    pub database_path: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            error_backoff_ms: default_error_backoff(),
            persistence_interval_ms: default_persistence_interval(),
            stop_timeout_ms: default_stop_timeout(),
            broadcast_timeout_ms: default_broadcast_timeout(),
            refresh_interval_ms: default_refresh_interval(),
            log_limit: default_log_limit(),
            export_limit: default_export_limit(),
            attribution_candidates: default_attribution_candidates(),
            database_path: String::new(),
            debug_mode: false,
        }
    }
}

/// Shortest wait between loop iterations; smaller configured values are raised
/// to this so a zero can't spin a loop or panic `tokio::time::interval`.
pub const MIN_LOOP_INTERVAL_MS: u64 = 10;

fn loop_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_LOOP_INTERVAL_MS))
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        loop_interval(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        loop_interval(self.error_backoff_ms)
    }

    pub fn persistence_interval(&self) -> Duration {
        loop_interval(self.persistence_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_millis(self.broadcast_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        loop_interval(self.refresh_interval_ms)
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_error_backoff() -> u64 {
    5000
}

fn default_persistence_interval() -> u64 {
    500
}

fn default_stop_timeout() -> u64 {
    5000
}

fn default_broadcast_timeout() -> u64 {
    5000
}

fn default_refresh_interval() -> u64 {
    2000
}

fn default_log_limit() -> usize {
    100
}

fn default_export_limit() -> usize {
    1000
}

fn default_attribution_candidates() -> Vec<String> {
    vec![
        "SystemSettings.exe".to_string(),
        "winlogon.exe".to_string(),
        "explorer.exe".to_string(),
    ]
}
