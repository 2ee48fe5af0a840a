//! Command-line surface. Dispatch lives in [`crate::ui::controller`].

use crate::models::ThemeMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "themewatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch, log and pin the Windows light/dark appearance setting"
)]
pub struct Cli {
    /// Data directory holding the config, history database and log files.
    #[clap(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log at debug level regardless of the config file.
    #[clap(long, global = true)]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Monitor theme changes until Ctrl+C
    Run {
        /// Keep both flags pinned to this theme (light, dark, 0 or 1)
        #[clap(long)]
        persist: Option<ThemeMode>,
    },
    /// Show the current theme and run-at-login status
    Status,
    /// Set both flags to a theme (light, dark, 0 or 1)
    Set { mode: ThemeMode },
    /// Show recorded theme changes, newest first
    Logs {
        /// Maximum number of entries (defaults to the configured log limit)
        #[clap(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Delete the change history
    ClearLogs,
    /// Export the change history as CSV
    Export {
        /// Output file (defaults to a timestamped file on the desktop)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
        /// Maximum number of entries (defaults to the configured export limit)
        #[clap(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Manage run-at-login registration
    Startup {
        #[clap(subcommand)]
        action: StartupAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupAction {
    Enable,
    Disable,
    Status,
}
