//! Integration tests for ConfigManager and the YAML user config
//!
//! These tests verify:
//! - Hand-written YAML with the documented key names loads
//! - Missing keys fall back to defaults
//! - Save/load keeps every setting
//! - Zero intervals load but never reach the loops as zero

use camino::Utf8PathBuf;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use themewatch::ConfigManager;
use themewatch::models::{MIN_LOOP_INTERVAL_MS, MonitorSettings, UserConfig};

fn manager() -> (ConfigManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (ConfigManager::new(&dir).unwrap(), temp_dir)
}

#[test]
fn test_hand_written_yaml_loads() {
    let (manager, _temp_dir) = manager();
    fs::write(
        manager.user_config_path(),
        r#"ThemeWatch_Settings:
  Poll Interval: 250
  Persistence Interval: 100
  Attribution Candidates:
    - SystemSettings.exe
    - AutoDarkMode.exe
  Database Path: history.db
  Debug Mode: true
"#,
    )
    .unwrap();

    let settings = manager.load_user_config().unwrap().settings;

    assert_eq!(settings.poll_interval(), Duration::from_millis(250));
    assert_eq!(settings.persistence_interval(), Duration::from_millis(100));
    assert_eq!(
        settings.attribution_candidates,
        vec!["SystemSettings.exe", "AutoDarkMode.exe"]
    );
    assert!(settings.debug_mode);

    // Unspecified keys keep their defaults
    assert_eq!(settings.error_backoff(), Duration::from_secs(5));
    assert_eq!(settings.stop_timeout(), Duration::from_secs(5));
    assert_eq!(settings.refresh_interval(), Duration::from_secs(2));
    assert_eq!(settings.log_limit, 100);

    assert_eq!(
        manager.database_path(&settings),
        manager.config_dir().join("history.db")
    );
}

#[tokio::test]
async fn test_zero_intervals_are_usable() {
    let (manager, _temp_dir) = manager();
    fs::write(
        manager.user_config_path(),
        r#"ThemeWatch_Settings:
  Poll Interval: 0
  Error Backoff: 0
  Persistence Interval: 0
  Refresh Interval: 0
"#,
    )
    .unwrap();

    let settings = manager.load_user_config().unwrap().settings;
    let floor = Duration::from_millis(MIN_LOOP_INTERVAL_MS);

    for interval in [
        settings.poll_interval(),
        settings.error_backoff(),
        settings.persistence_interval(),
        settings.refresh_interval(),
    ] {
        assert_eq!(interval, floor);
    }

    // A zero period would panic here
    let mut ticker = tokio::time::interval(settings.refresh_interval());
    ticker.tick().await;
    ticker.tick().await;
}

#[test]
fn test_empty_section_uses_defaults() {
    let (manager, _temp_dir) = manager();
    fs::write(manager.user_config_path(), "ThemeWatch_Settings: {}\n").unwrap();

    let settings = manager.load_user_config().unwrap().settings;
    let defaults = MonitorSettings::default();

    assert_eq!(settings.poll_interval_ms, defaults.poll_interval_ms);
    assert_eq!(settings.attribution_candidates, defaults.attribution_candidates);
    assert!(settings.database_path.is_empty());
}

#[test]
fn test_save_then_load_keeps_settings() {
    let (manager, _temp_dir) = manager();

    let mut config = UserConfig::default();
    config.settings.export_limit = 50;
    config.settings.attribution_candidates = vec!["explorer.exe".to_string()];
    manager.save_user_config(&config).unwrap();

    let yaml = fs::read_to_string(manager.user_config_path()).unwrap();
    assert!(yaml.contains("ThemeWatch_Settings"));
    assert!(yaml.contains("Export Limit"));

    let loaded = manager.load_user_config().unwrap().settings;
    assert_eq!(loaded.export_limit, 50);
    assert_eq!(loaded.attribution_candidates, vec!["explorer.exe"]);
}

#[test]
fn test_log_dir_is_inside_data_dir() {
    let (manager, _temp_dir) = manager();
    assert_eq!(manager.log_dir(), manager.config_dir().join("logs"));
}
