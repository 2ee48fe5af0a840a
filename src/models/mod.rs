//! Data models for the ThemeWatch application.
//!
//! - [`ThemeState`]: both appearance flags as read from the setting namespace
//! - [`ThemeMode`]: the light/dark choice a user or persistence mode asks for
//! - [`PersistenceConfig`]: in-memory persistence mode switch and target
//! - [`LogEntry`] / [`NewLogEntry`]: rows of the change history
//! - [`UserConfig`]: monitor settings loaded from `ThemeWatch Config.yaml`

pub mod config;
pub mod log_entry;
pub mod theme;

pub use config::{MIN_LOOP_INTERVAL_MS, MonitorSettings, UserConfig};
pub use log_entry::{LogEntry, NewLogEntry, PERSISTENCE_SOURCE, UNKNOWN_SOURCE};
pub use theme::{PersistenceConfig, ThemeMode, ThemeState, ThemeValueError};
