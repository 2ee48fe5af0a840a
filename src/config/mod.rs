use crate::models::{MonitorSettings, UserConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Directory name under the per-user config directory.
pub const DATA_DIR_NAME: &str = "ThemeMonitor";

pub const USER_CONFIG_FILE: &str = "ThemeWatch Config.yaml";

/// File name of the change history inside the data directory.
pub const DATABASE_FILE: &str = "logs.db";

/// Default data directory, e.g. `%APPDATA%\ThemeMonitor` on Windows.
pub fn default_data_dir() -> Result<Utf8PathBuf> {
    let base = dirs::config_dir().context("Could not determine the user config directory")?;
    let base = Utf8PathBuf::try_from(base).context("User config directory is not valid UTF-8")?;
    Ok(base.join(DATA_DIR_NAME))
}

/// Configuration manager for the monitor's data directory.
///
/// Owns the YAML user config (`ThemeWatch Config.yaml`) and knows where the
/// change history and log files live.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at `config_dir`, creating it if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            user_config_path: config_dir.join(USER_CONFIG_FILE),
            config_dir,
        })
    }

    /// Load the user configuration file.
    ///
    /// # Returns
    /// The loaded UserConfig, or default if file doesn't exist
    pub fn load_user_config(&self) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "User config file not found at {}, using defaults",
                self.user_config_path
            );
            return Ok(UserConfig::default());
        }

        let file_contents = fs::read_to_string(&self.user_config_path)
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let config: UserConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        tracing::info!("Loaded user config from {}", self.user_config_path);
        Ok(config)
    }

    /// Save the user configuration file.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml_string)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("Saved user config to {}", self.user_config_path);
        Ok(())
    }

    /// Where the change history lives: the configured path, or `logs.db` here.
    ///
    /// A relative configured path is taken relative to the data directory.
    pub fn database_path(&self, settings: &MonitorSettings) -> Utf8PathBuf {
        let configured = settings.database_path.trim();
        if configured.is_empty() {
            return self.config_dir.join(DATABASE_FILE);
        }

        let configured = Utf8Path::new(configured);
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.config_dir.join(configured)
        }
    }

    pub fn log_dir(&self) -> Utf8PathBuf {
        self.config_dir.join("logs")
    }

    pub fn user_config_path(&self) -> &Utf8Path {
        &self.user_config_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
