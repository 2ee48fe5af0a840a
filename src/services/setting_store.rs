//! Access to the per-user appearance settings.
//!
//! [`SettingBackend`] is the raw namespace (the HKCU registry hive on Windows, an
//! in-memory map elsewhere and in tests). [`SettingStore`] is the adapter the
//! monitor talks to: it knows which two values make up a [`ThemeState`], never
//! lets a failure escape as a panic, and announces successful writes to the rest
//! of the desktop.

use crate::models::{ThemeMode, ThemeState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Per-user key holding both appearance flags.
pub const THEME_REGISTRY_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Themes\Personalize";

pub const APPS_USE_LIGHT_THEME: &str = "AppsUseLightTheme";

pub const SYSTEM_USES_LIGHT_THEME: &str = "SystemUsesLightTheme";

/// Payload of the setting-change broadcast that makes windows re-read the theme.
pub const SETTING_CHANGE_AREA: &str = "ImmersiveColorSet";

/// Errors raised by a [`SettingBackend`]
#[derive(Error, Debug)]
pub enum SettingStoreError {
    #[error("Setting path not found: {0}")]
    PathNotFound(String),

    #[error("Value {name} not found under {path}")]
    ValueNotFound { path: String, name: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Registry error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Setting change broadcast failed: {0}")]
    BroadcastFailed(String),
}

/// Raw per-user configuration namespace.
///
/// Paths are backslash separated and relative to the current user's root.
#[cfg_attr(test, mockall::automock)]
pub trait SettingBackend: Send + Sync {
    fn get_dword(&self, path: &str, name: &str) -> Result<u32, SettingStoreError>;

    /// Write several values under a single open handle to `path`.
    fn set_dwords(&self, path: &str, values: &[(&'static str, u32)])
    -> Result<(), SettingStoreError>;

    /// `Ok(None)` when the value (or its key) does not exist.
    fn get_string(&self, path: &str, name: &str) -> Result<Option<String>, SettingStoreError>;

    /// Creates the key when it is missing.
    fn set_string(&self, path: &str, name: &str, value: &str) -> Result<(), SettingStoreError>;

    /// Deleting a value that is already absent succeeds.
    fn delete_value(&self, path: &str, name: &str) -> Result<(), SettingStoreError>;

    /// Tell running programs that `area` changed, waiting at most `timeout` for
    /// each recipient.
    fn broadcast_setting_change(
        &self,
        area: &str,
        timeout: Duration,
    ) -> Result<(), SettingStoreError>;
}

/// Adapter over the two appearance flags.
#[derive(Clone)]
pub struct SettingStore {
    backend: Arc<dyn SettingBackend>,
    broadcast_timeout: Duration,
}

impl SettingStore {
    pub fn new(backend: Arc<dyn SettingBackend>, broadcast_timeout: Duration) -> Self {
        Self {
            backend,
            broadcast_timeout,
        }
    }

    /// The underlying namespace, shared with the startup registrar.
    pub fn backend(&self) -> Arc<dyn SettingBackend> {
        Arc::clone(&self.backend)
    }

    /// Read both flags, reporting failures to the caller.
    pub fn try_read(&self) -> Result<ThemeState, SettingStoreError> {
        let apps = self
            .backend
            .get_dword(THEME_REGISTRY_PATH, APPS_USE_LIGHT_THEME)?;
        let system = self
            .backend
            .get_dword(THEME_REGISTRY_PATH, SYSTEM_USES_LIGHT_THEME)?;
        Ok(ThemeState::new(apps, system))
    }

    /// Read both flags. Any failure yields dark/dark and a warning.
    pub fn read(&self) -> ThemeState {
        match self.try_read() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Failed to read theme from setting store: {}", e);
                ThemeState::default()
            }
        }
    }

    /// Write `mode` to both flags. Returns false on any failure.
    pub fn write(&self, mode: ThemeMode) -> bool {
        let value = mode.value();
        let values = [
            (APPS_USE_LIGHT_THEME, value),
            (SYSTEM_USES_LIGHT_THEME, value),
        ];

        match self.backend.set_dwords(THEME_REGISTRY_PATH, &values) {
            Ok(()) => {
                tracing::info!("Theme set to {}", mode);
                true
            }
            Err(e) => {
                tracing::error!("Failed to set theme to {}: {}", mode, e);
                false
            }
        }
    }

    /// Best-effort change notification. Failures are logged and swallowed.
    pub fn broadcast(&self) {
        match self
            .backend
            .broadcast_setting_change(SETTING_CHANGE_AREA, self.broadcast_timeout)
        {
            Ok(()) => tracing::debug!("Broadcast {} change", SETTING_CHANGE_AREA),
            Err(e) => tracing::warn!("Failed to broadcast theme change: {}", e),
        }
    }

    /// Write then broadcast. The result reflects the write alone.
    pub fn apply(&self, mode: ThemeMode) -> bool {
        if !self.write(mode) {
            return false;
        }
        self.broadcast();
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Dword(u32),
    Text(String),
}

/// In-memory namespace.
///
/// Used on platforms without a native appearance store and as the test double
/// for the registry. Failures can be switched on to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<(String, String), StoredValue>>,
    broadcasts: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_broadcasts: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A namespace already holding both appearance flags.
    pub fn with_theme(state: ThemeState) -> Self {
        let backend = Self::new();
        backend.set_theme_externally(state);
        backend
    }

    /// Change the flags the way another program would: no broadcast, no checks.
    pub fn set_theme_externally(&self, state: ThemeState) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(
            key(THEME_REGISTRY_PATH, APPS_USE_LIGHT_THEME),
            StoredValue::Dword(state.apps),
        );
        values.insert(
            key(THEME_REGISTRY_PATH, SYSTEM_USES_LIGHT_THEME),
            StoredValue::Dword(state.system),
        );
    }

    /// Number of successful broadcasts so far.
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_broadcasts(&self, fail: bool) {
        self.fail_broadcasts.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self, path: &str) -> Result<(), SettingStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SettingStoreError::AccessDenied(path.to_string()));
        }
        Ok(())
    }
}

fn key(path: &str, name: &str) -> (String, String) {
    (path.to_ascii_lowercase(), name.to_ascii_lowercase())
}

impl SettingBackend for MemoryBackend {
    fn get_dword(&self, path: &str, name: &str) -> Result<u32, SettingStoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SettingStoreError::AccessDenied(path.to_string()));
        }

        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        match values.get(&key(path, name)) {
            Some(StoredValue::Dword(value)) => Ok(*value),
            _ => Err(SettingStoreError::ValueNotFound {
                path: path.to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn set_dwords(
        &self,
        path: &str,
        values: &[(&'static str, u32)],
    ) -> Result<(), SettingStoreError> {
        self.check_writable(path)?;

        let mut stored = self.values.write().unwrap_or_else(|e| e.into_inner());
        for (name, value) in values {
            stored.insert(key(path, name), StoredValue::Dword(*value));
        }
        Ok(())
    }

    fn get_string(&self, path: &str, name: &str) -> Result<Option<String>, SettingStoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SettingStoreError::AccessDenied(path.to_string()));
        }

        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(match values.get(&key(path, name)) {
            Some(StoredValue::Text(text)) => Some(text.clone()),
            _ => None,
        })
    }

    fn set_string(&self, path: &str, name: &str, value: &str) -> Result<(), SettingStoreError> {
        self.check_writable(path)?;

        let mut stored = self.values.write().unwrap_or_else(|e| e.into_inner());
        stored.insert(key(path, name), StoredValue::Text(value.to_string()));
        Ok(())
    }

    fn delete_value(&self, path: &str, name: &str) -> Result<(), SettingStoreError> {
        self.check_writable(path)?;

        let mut stored = self.values.write().unwrap_or_else(|e| e.into_inner());
        stored.remove(&key(path, name));
        Ok(())
    }

    fn broadcast_setting_change(
        &self,
        area: &str,
        _timeout: Duration,
    ) -> Result<(), SettingStoreError> {
        if self.fail_broadcasts.load(Ordering::SeqCst) {
            return Err(SettingStoreError::BroadcastFailed(format!(
                "no recipient acknowledged {}",
                area
            )));
        }
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(windows)]
pub use registry::RegistryBackend;

#[cfg(windows)]
mod registry {
    use super::{SettingBackend, SettingStoreError};
    use std::io;
    use std::time::Duration;
    use winreg::RegKey;
    use winreg::enums::{HKEY_CURRENT_USER, KEY_QUERY_VALUE, KEY_SET_VALUE};

    /// HKEY_CURRENT_USER registry hive.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RegistryBackend;

    impl RegistryBackend {
        pub fn new() -> Self {
            Self
        }

        fn hkcu() -> RegKey {
            RegKey::predef(HKEY_CURRENT_USER)
        }
    }

    fn not_found(e: &io::Error) -> bool {
        e.kind() == io::ErrorKind::NotFound
    }

    impl SettingBackend for RegistryBackend {
        fn get_dword(&self, path: &str, name: &str) -> Result<u32, SettingStoreError> {
            let key = Self::hkcu().open_subkey(path).map_err(|e| {
                if not_found(&e) {
                    SettingStoreError::PathNotFound(path.to_string())
                } else {
                    SettingStoreError::Io(e)
                }
            })?;

            key.get_value::<u32, _>(name).map_err(|e| {
                if not_found(&e) {
                    SettingStoreError::ValueNotFound {
                        path: path.to_string(),
                        name: name.to_string(),
                    }
                } else {
                    SettingStoreError::Io(e)
                }
            })
        }

        fn set_dwords(
            &self,
            path: &str,
            values: &[(&'static str, u32)],
        ) -> Result<(), SettingStoreError> {
            let key = Self::hkcu().open_subkey_with_flags(path, KEY_SET_VALUE)?;
            for (name, value) in values {
                key.set_value(name, value)?;
            }
            Ok(())
        }

        fn get_string(&self, path: &str, name: &str) -> Result<Option<String>, SettingStoreError> {
            let key = match Self::hkcu().open_subkey_with_flags(path, KEY_QUERY_VALUE) {
                Ok(key) => key,
                Err(e) if not_found(&e) => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            match key.get_value::<String, _>(name) {
                Ok(value) => Ok(Some(value)),
                Err(e) if not_found(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn set_string(&self, path: &str, name: &str, value: &str) -> Result<(), SettingStoreError> {
            let (key, _) = Self::hkcu().create_subkey(path)?;
            key.set_value(name, &value.to_string())?;
            Ok(())
        }

        fn delete_value(&self, path: &str, name: &str) -> Result<(), SettingStoreError> {
            let key = match Self::hkcu().open_subkey_with_flags(path, KEY_SET_VALUE) {
                Ok(key) => key,
                Err(e) if not_found(&e) => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            match key.delete_value(name) {
                Ok(()) => Ok(()),
                Err(e) if not_found(&e) => Ok(()),
                Err(e) => Err(e.into()),
            }
        }

        fn broadcast_setting_change(
            &self,
            area: &str,
            timeout: Duration,
        ) -> Result<(), SettingStoreError> {
            use windows_sys::Win32::UI::WindowsAndMessaging::{
                HWND_BROADCAST, SMTO_ABORTIFHUNG, SendMessageTimeoutW, WM_SETTINGCHANGE,
            };

            let payload: Vec<u16> = area.encode_utf16().chain(std::iter::once(0)).collect();
            let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
            let mut result: usize = 0;

            // SAFETY: `payload` is a NUL-terminated UTF-16 string that outlives the call,
            // and `result` is a valid out pointer.
            let sent = unsafe {
                SendMessageTimeoutW(
                    HWND_BROADCAST,
                    WM_SETTINGCHANGE,
                    0,
                    payload.as_ptr() as isize,
                    SMTO_ABORTIFHUNG,
                    timeout_ms,
                    &mut result,
                )
            };

            if sent == 0 {
                return Err(SettingStoreError::BroadcastFailed(
                    io::Error::last_os_error().to_string(),
                ));
            }

            tracing::debug!("Broadcast result: {}", result);
            Ok(())
        }
    }
}

/// The namespace for this platform.
///
/// Windows gets the real registry. Everywhere else there is no equivalent store,
/// so an in-memory namespace seeded with the dark theme is used instead.
pub fn default_backend() -> Arc<dyn SettingBackend> {
    #[cfg(windows)]
    {
        Arc::new(RegistryBackend::new())
    }

    #[cfg(not(windows))]
    {
        tracing::warn!("No native appearance setting store on this platform, using in-memory store");
        Arc::new(MemoryBackend::with_theme(ThemeState::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store(state: ThemeState) -> (Arc<MemoryBackend>, SettingStore) {
        let backend = Arc::new(MemoryBackend::with_theme(state));
        let store = SettingStore::new(backend.clone(), Duration::from_secs(5));
        (backend, store)
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let (_backend, store) = memory_store(ThemeState::new(0, 0));

        assert!(store.write(ThemeMode::Light));
        assert_eq!(store.read(), ThemeState::new(1, 1));
    }

    #[test]
    fn test_apply_broadcasts_after_successful_write() {
        let (backend, store) = memory_store(ThemeState::new(0, 0));

        assert!(store.apply(ThemeMode::Light));
        assert_eq!(backend.broadcast_count(), 1);
    }

    #[test]
    fn test_apply_skips_broadcast_when_write_fails() {
        let (backend, store) = memory_store(ThemeState::new(0, 0));
        backend.set_fail_writes(true);

        assert!(!store.apply(ThemeMode::Light));
        assert_eq!(backend.broadcast_count(), 0);
        assert_eq!(store.read(), ThemeState::new(0, 0));
    }

    #[test]
    fn test_read_missing_values_defaults_to_dark() {
        let store = SettingStore::new(Arc::new(MemoryBackend::new()), Duration::from_secs(1));

        assert!(store.try_read().is_err());
        assert_eq!(store.read(), ThemeState::new(0, 0));
    }

    #[test]
    fn test_read_access_denied_defaults_to_dark() {
        let mut mock = MockSettingBackend::new();
        mock.expect_get_dword()
            .returning(|path, _| Err(SettingStoreError::AccessDenied(path.to_string())));

        let store = SettingStore::new(Arc::new(mock), Duration::from_secs(1));
        assert_eq!(store.read(), ThemeState::default());
    }

    #[test]
    fn test_write_failure_returns_false() {
        let mut mock = MockSettingBackend::new();
        mock.expect_set_dwords()
            .times(1)
            .returning(|path, _| Err(SettingStoreError::AccessDenied(path.to_string())));
        mock.expect_broadcast_setting_change().never();

        let store = SettingStore::new(Arc::new(mock), Duration::from_secs(1));
        assert!(!store.apply(ThemeMode::Dark));
    }

    #[test]
    fn test_write_sends_both_values_in_one_call() {
        let mut mock = MockSettingBackend::new();
        mock.expect_set_dwords()
            .times(1)
            .returning(|path, values| {
                assert_eq!(path, THEME_REGISTRY_PATH);
                assert_eq!(
                    values.to_vec(),
                    vec![(APPS_USE_LIGHT_THEME, 1), (SYSTEM_USES_LIGHT_THEME, 1)]
                );
                Ok(())
            });

        let store = SettingStore::new(Arc::new(mock), Duration::from_secs(1));
        assert!(store.write(ThemeMode::Light));
    }

    #[test]
    fn test_broadcast_failure_does_not_fail_apply() {
        let mut mock = MockSettingBackend::new();
        mock.expect_set_dwords().returning(|_, _| Ok(()));
        mock.expect_broadcast_setting_change()
            .times(1)
            .returning(|area, _| {
                assert_eq!(area, SETTING_CHANGE_AREA);
                Err(SettingStoreError::BroadcastFailed("hung window".to_string()))
            });

        let store = SettingStore::new(Arc::new(mock), Duration::from_secs(1));
        assert!(store.apply(ThemeMode::Light));
    }

    #[test]
    fn test_memory_backend_strings() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get_string("Run", "App").unwrap(), None);

        backend.set_string("Run", "App", "C:\\app.exe").unwrap();
        assert_eq!(
            backend.get_string("Run", "App").unwrap(),
            Some("C:\\app.exe".to_string())
        );

        backend.delete_value("Run", "App").unwrap();
        backend.delete_value("Run", "App").unwrap();
        assert_eq!(backend.get_string("Run", "App").unwrap(), None);
    }
}
