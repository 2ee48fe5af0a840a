// CLI Controller - routes parsed commands to the theme service
//
// This module contains the CliController which coordinates between:
// - the parsed command line (Cli / Command)
// - ThemeService (engine operations)
// - StartupRegistrar (run-at-login)
// - StatusRefresher (live view while monitoring)
//
// Command output goes to the writer passed in; diagnostics go through tracing.

use crate::models::{MonitorSettings, ThemeMode};
use crate::service::ThemeService;
use crate::services::export;
use crate::services::startup::{StartupRegistrar, current_command_line};
use crate::ui::cli::{Command, StartupAction};
use crate::ui::status::{StatusRefresher, format_entry, format_status};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Write;

/// Dispatches one command line invocation.
///
/// Every handler returns `Ok(true)` on success and `Ok(false)` for a failure
/// already reported to the user (the process then exits non-zero).
pub struct CliController {
    service: ThemeService,
    registrar: StartupRegistrar,
    settings: MonitorSettings,
    data_dir: Utf8PathBuf,
    runtime: tokio::runtime::Handle,
}

impl CliController {
    pub fn new(
        service: ThemeService,
        registrar: StartupRegistrar,
        settings: MonitorSettings,
        data_dir: &Utf8Path,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            service,
            registrar,
            settings,
            data_dir: data_dir.to_path_buf(),
            runtime,
        }
    }

    pub fn service(&self) -> &ThemeService {
        &self.service
    }

    pub fn execute<W: Write>(&self, command: Command, out: &mut W) -> Result<bool> {
        tracing::debug!("Executing command: {:?}", command);

        match command {
            Command::Run { persist } => self.run_monitor(persist, out),
            Command::Status => self.show_status(out),
            Command::Set { mode } => self.set_theme(mode, out),
            Command::Logs { limit } => self.show_logs(limit.unwrap_or(self.settings.log_limit), out),
            Command::ClearLogs => self.clear_logs(out),
            Command::Export { output, limit } => {
                let output = output
                    .map(Utf8PathBuf::try_from)
                    .transpose()
                    .context("Export path is not valid UTF-8")?;
                self.export_logs(output, limit.unwrap_or(self.settings.export_limit), out)
            }
            Command::Startup { action } => self.startup(action, out),
        }
    }

    /// Monitor until Ctrl+C. Must be called from outside the runtime.
    fn run_monitor<W: Write>(&self, persist: Option<ThemeMode>, out: &mut W) -> Result<bool> {
        self.service.start();
        if let Some(mode) = persist {
            self.service.enable_persistence(mode);
        }

        let refresher = StatusRefresher::spawn(
            self.service.clone(),
            self.settings.refresh_interval(),
            self.settings.log_limit,
            &self.runtime,
        );

        writeln!(out, "Monitoring theme changes. Press Ctrl+C to stop.")?;
        out.flush()?;

        self.runtime
            .block_on(tokio::signal::ctrl_c())
            .context("Failed to listen for Ctrl+C")?;

        tracing::info!("Ctrl+C received, shutting down");
        self.runtime.block_on(async {
            refresher.stop().await;
            self.service.stop().await;
        });

        writeln!(out, "Monitoring stopped")?;
        Ok(true)
    }

    fn show_status<W: Write>(&self, out: &mut W) -> Result<bool> {
        let mut status = self.service.status();
        status.current_theme = self.service.get_current_theme();

        writeln!(out, "{}", format_status(&status))?;
        writeln!(
            out,
            "Run at login: {}",
            if self.registrar.is_enabled() {
                "enabled"
            } else {
                "disabled"
            }
        )?;
        Ok(true)
    }

    fn set_theme<W: Write>(&self, mode: ThemeMode, out: &mut W) -> Result<bool> {
        if self.service.set_theme(mode) {
            writeln!(out, "Theme set to {}", mode)?;
            Ok(true)
        } else {
            writeln!(out, "Failed to change theme")?;
            Ok(false)
        }
    }

    fn show_logs<W: Write>(&self, limit: usize, out: &mut W) -> Result<bool> {
        let entries = self.service.get_logs(limit);
        if entries.is_empty() {
            writeln!(out, "No theme changes recorded")?;
            return Ok(true);
        }

        for entry in &entries {
            writeln!(out, "{}", format_entry(entry))?;
        }
        Ok(true)
    }

    fn clear_logs<W: Write>(&self, out: &mut W) -> Result<bool> {
        if self.service.clear_logs() {
            writeln!(out, "Logs cleared")?;
            Ok(true)
        } else {
            writeln!(out, "Failed to clear logs")?;
            Ok(false)
        }
    }

    fn export_logs<W: Write>(
        &self,
        output: Option<Utf8PathBuf>,
        limit: usize,
        out: &mut W,
    ) -> Result<bool> {
        let entries = self.service.get_logs(limit);
        let path = output.unwrap_or_else(|| export::default_export_path(&self.data_dir));

        match export::export_logs(&entries, &path) {
            Ok(true) => {
                writeln!(out, "Exported {} entries to {}", entries.len(), path)?;
                Ok(true)
            }
            Ok(false) => {
                writeln!(out, "No logs to export")?;
                Ok(true)
            }
            Err(e) => {
                tracing::error!("Export failed: {:#}", e);
                writeln!(out, "Failed to export logs: {:#}", e)?;
                Ok(false)
            }
        }
    }

    fn startup<W: Write>(&self, action: StartupAction, out: &mut W) -> Result<bool> {
        let changed = match action {
            StartupAction::Status => {
                let state = if self.registrar.is_enabled() {
                    "enabled"
                } else {
                    "disabled"
                };
                writeln!(out, "Run at login: {}", state)?;
                return Ok(true);
            }
            StartupAction::Enable => match current_command_line() {
                Ok(command_line) => self.registrar.enable(&command_line),
                Err(e) => {
                    tracing::error!("Could not locate the running executable: {}", e);
                    false
                }
            },
            StartupAction::Disable => self.registrar.disable(),
        };

        if changed {
            writeln!(out, "Startup setting updated")?;
        } else {
            writeln!(out, "Failed to change startup setting")?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThemeState;
    use crate::monitor::MonitorEngine;
    use crate::services::attribution::ProcessAttributor;
    use crate::services::change_log::ChangeLogStore;
    use crate::services::setting_store::{MemoryBackend, SettingStore};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        backend: Arc<MemoryBackend>,
        controller: CliController,
        data_dir: Utf8PathBuf,
        _runtime: tokio::runtime::Runtime,
        _temp_dir: TempDir,
    }

    fn harness() -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let backend = Arc::new(MemoryBackend::with_theme(ThemeState::new(0, 0)));
        let store = SettingStore::new(backend.clone(), Duration::from_millis(10));
        let log = ChangeLogStore::open(data_dir.join("logs.db")).unwrap();
        let engine = MonitorEngine::new(
            store,
            log,
            ProcessAttributor::system(&[]),
            MonitorSettings::default(),
            runtime.handle().clone(),
        );
        let controller = CliController::new(
            ThemeService::new(engine),
            StartupRegistrar::new(backend.clone()),
            MonitorSettings::default(),
            &data_dir,
            runtime.handle().clone(),
        );

        Harness {
            backend,
            controller,
            data_dir,
            _runtime: runtime,
            _temp_dir: temp_dir,
        }
    }

    fn run(h: &Harness, command: Command) -> (bool, String) {
        let mut out = Vec::new();
        let ok = h.controller.execute(command, &mut out).unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_set_theme_success_and_failure() {
        let h = harness();

        let (ok, out) = run(&h, Command::Set { mode: ThemeMode::Light });
        assert!(ok);
        assert_eq!(out, "Theme set to Light\n");
        assert_eq!(h.controller.service().get_current_theme(), ThemeState::new(1, 1));

        h.backend.set_fail_writes(true);
        let (ok, out) = run(&h, Command::Set { mode: ThemeMode::Dark });
        assert!(!ok);
        assert_eq!(out, "Failed to change theme\n");
    }

    #[test]
    fn test_logs_and_clear() {
        let h = harness();

        let (_, out) = run(&h, Command::Logs { limit: None });
        assert_eq!(out, "No theme changes recorded\n");

        h.backend.set_theme_externally(ThemeState::new(1, 1));
        h.controller.service().engine().poll_once().unwrap();

        let (ok, out) = run(&h, Command::Logs { limit: Some(5) });
        assert!(ok);
        assert!(out.contains("Light by unknown"));

        let (ok, out) = run(&h, Command::ClearLogs);
        assert!(ok);
        assert_eq!(out, "Logs cleared\n");
        assert!(h.controller.service().get_logs(10).is_empty());
    }

    #[test]
    fn test_export_writes_requested_file() {
        let h = harness();
        let path = h.data_dir.join("export.csv");

        let (ok, out) = run(
            &h,
            Command::Export {
                output: Some(path.clone().into_std_path_buf()),
                limit: None,
            },
        );
        assert!(ok);
        assert_eq!(out, "No logs to export\n");
        assert!(!path.exists());

        h.backend.set_theme_externally(ThemeState::new(1, 0));
        h.controller.service().engine().poll_once().unwrap();

        let (ok, _) = run(
            &h,
            Command::Export {
                output: Some(path.clone().into_std_path_buf()),
                limit: None,
            },
        );
        assert!(ok);
        let csv = std::fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with(export::CSV_HEADER));
        assert!(csv.contains("\"Apps: 0 -> 1, System: 0 -> 0\""));
    }

    #[test]
    fn test_startup_enable_status_disable() {
        let h = harness();

        let (ok, out) = run(&h, Command::Startup { action: StartupAction::Enable });
        assert!(ok);
        assert_eq!(out, "Startup setting updated\n");

        let (_, out) = run(&h, Command::Startup { action: StartupAction::Status });
        assert_eq!(out, "Run at login: enabled\n");

        h.backend.set_fail_writes(true);
        let (ok, out) = run(&h, Command::Startup { action: StartupAction::Disable });
        assert!(!ok);
        assert_eq!(out, "Failed to change startup setting\n");
    }

    #[test]
    fn test_status_reads_live_theme() {
        let h = harness();
        h.backend.set_theme_externally(ThemeState::new(1, 0));

        let (ok, out) = run(&h, Command::Status);
        assert!(ok);
        assert!(out.starts_with("Theme: Light {apps: 1, system: 0}"));
        assert!(out.contains("Run at login: disabled"));
    }
}
