//! ThemeWatch - Windows light/dark appearance monitor
//!
//! Main entry point for the command-line application.
//!
//! # Overview
//!
//! The binary initializes:
//! - Configuration loading ([`ConfigManager`]) from the data directory
//! - Logging infrastructure (daily rolling file, console output for `run`)
//! - Tokio async runtime (monitor loops and the status refresher)
//! - The monitor engine and its [`ThemeService`] facade
//! - The [`CliController`] that runs the requested command
//!
//! # Execution Flow
//!
//! 1. Parse the command line
//! 2. Resolve the data directory (`--data-dir`, else `%APPDATA%\ThemeMonitor`)
//! 3. Load `ThemeWatch Config.yaml` (defaults when missing)
//! 4. Initialize logging → `<data dir>/logs/themewatch.log.<date>`
//! 5. Create the tokio runtime
//! 6. Open the change history (fatal if it can't be created)
//! 7. Build the engine, service and controller, then run the command
//! 8. Shutdown the tokio runtime with a 5s timeout
//!
//! # Platform
//!
//! Primary platform: Windows 10/11. Elsewhere the appearance flags live in
//! memory only, which is enough to exercise the command surface.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use themewatch::config::{ConfigManager, default_data_dir};
use themewatch::monitor::MonitorEngine;
use themewatch::services::{
    ChangeLogStore, ProcessAttributor, SettingStore, StartupRegistrar, default_backend,
};
use themewatch::ui::{Cli, CliController, Command};
use themewatch::{APP_NAME, ThemeService, VERSION};

const WORKER_THREADS: usize = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("Fatal error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let data_dir = match cli.data_dir {
        Some(dir) => Utf8PathBuf::try_from(dir).context("Data directory is not valid UTF-8")?,
        None => default_data_dir()?,
    };

    let config_manager = ConfigManager::new(&data_dir)?;
    let user_config = config_manager.load_user_config()?;
    let settings = user_config.settings;

    // Console output only while monitoring; one-shot commands print results.
    let console = matches!(cli.command, Command::Run { .. });
    let _log_guard = themewatch::logging::setup_logging_with_console(
        &config_manager.log_dir(),
        themewatch::logging::LOG_PREFIX,
        cli.debug || settings.debug_mode,
        console,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    tracing::info!("Data directory: {}", data_dir);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(WORKER_THREADS)
        .thread_name("themewatch-worker")
        .build()
        .context("Failed to create tokio runtime")?;

    tracing::info!(
        "Tokio runtime initialized with {} worker threads",
        WORKER_THREADS
    );

    let backend = default_backend();
    let store = SettingStore::new(backend.clone(), settings.broadcast_timeout());

    let db_path = config_manager.database_path(&settings);
    let log = ChangeLogStore::open(&db_path)
        .with_context(|| format!("Failed to open change history at {}", db_path))?;
    tracing::info!("Change history: {}", db_path);

    let attributor = ProcessAttributor::system(&settings.attribution_candidates);

    let engine = MonitorEngine::new(
        store,
        log,
        attributor,
        settings.clone(),
        runtime.handle().clone(),
    );
    let service = ThemeService::new(engine);

    let controller = CliController::new(
        service,
        StartupRegistrar::new(backend),
        settings,
        &data_dir,
        runtime.handle().clone(),
    );

    // Not locked: the status refresher prints from a worker thread.
    let mut stdout = std::io::stdout();
    let result = controller.execute(cli.command, &mut stdout);
    drop(controller);

    runtime.shutdown_timeout(Duration::from_secs(5));
    tracing::info!("Application shutdown complete");

    result
}
