// ThemeWatch - Windows light/dark appearance monitor
//
// This is the library crate containing the monitor engine and its services.
// The binary crate (main.rs) provides the command-line entry point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod service;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{LogEntry, MonitorSettings, PersistenceConfig, ThemeMode, ThemeState, UserConfig};
pub use monitor::{MonitorEngine, MonitorError};
pub use service::ThemeService;
pub use state::{MonitorState, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
