//! Run-at-login registration.

use crate::services::setting_store::SettingBackend;
use std::sync::Arc;

/// Per-user list of programs started at login.
pub const STARTUP_REGISTRY_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// Value name this application registers under.
pub const STARTUP_VALUE_NAME: &str = "WindowsThemeMonitor";

/// Registers or removes this executable from the run-at-login list.
///
/// Goes through the same [`SettingBackend`] as the theme flags, so tests can
/// drive it with the in-memory namespace.
pub struct StartupRegistrar {
    backend: Arc<dyn SettingBackend>,
}

impl StartupRegistrar {
    pub fn new(backend: Arc<dyn SettingBackend>) -> Self {
        Self { backend }
    }

    pub fn is_enabled(&self) -> bool {
        match self
            .backend
            .get_string(STARTUP_REGISTRY_PATH, STARTUP_VALUE_NAME)
        {
            Ok(value) => value.is_some(),
            Err(e) => {
                tracing::error!("Error checking startup status: {}", e);
                false
            }
        }
    }

    /// Register `command_line` to run at login.
    pub fn enable(&self, command_line: &str) -> bool {
        match self
            .backend
            .set_string(STARTUP_REGISTRY_PATH, STARTUP_VALUE_NAME, command_line)
        {
            Ok(()) => {
                tracing::info!("Startup enabled: {}", command_line);
                true
            }
            Err(e) => {
                tracing::error!("Failed to enable startup: {}", e);
                false
            }
        }
    }

    /// Remove the registration. Already absent counts as success.
    pub fn disable(&self) -> bool {
        match self
            .backend
            .delete_value(STARTUP_REGISTRY_PATH, STARTUP_VALUE_NAME)
        {
            Ok(()) => {
                tracing::info!("Startup disabled");
                true
            }
            Err(e) => {
                tracing::error!("Failed to disable startup: {}", e);
                false
            }
        }
    }
}

/// Command line that relaunches the running executable in monitor mode.
pub fn current_command_line() -> std::io::Result<String> {
    let exe = std::env::current_exe()?;
    Ok(format!("\"{}\" run", exe.display()))
}
