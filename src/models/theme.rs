use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw value stored for the dark appearance.
pub const DARK_VALUE: u32 = 0;

/// Raw value stored for the light appearance.
pub const LIGHT_VALUE: u32 = 1;

/// The two appearance modes a user can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeMode {
    Dark,
    Light,
}

impl ThemeMode {
    /// Interpret a raw stored value. Anything non-zero reads as light, which is
    /// how the OS itself treats the flag.
    pub fn from_raw(value: u32) -> Self {
        if value == DARK_VALUE {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }

    /// The raw value written to the setting namespace.
    pub fn value(self) -> u32 {
        match self {
            ThemeMode::Dark => DARK_VALUE,
            ThemeMode::Light => LIGHT_VALUE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Dark => "Dark",
            ThemeMode::Light => "Light",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejected theme value from a command or caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid theme value '{0}' (expected 0, 1, dark or light)")]
pub struct ThemeValueError(pub String);

impl TryFrom<u32> for ThemeMode {
    type Error = ThemeValueError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            DARK_VALUE => Ok(ThemeMode::Dark),
            LIGHT_VALUE => Ok(ThemeMode::Light),
            other => Err(ThemeValueError(other.to_string())),
        }
    }
}

impl FromStr for ThemeMode {
    type Err = ThemeValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "dark" => Ok(ThemeMode::Dark),
            "1" | "light" => Ok(ThemeMode::Light),
            _ => Err(ThemeValueError(s.to_string())),
        }
    }
}

/// Snapshot of both appearance flags.
///
/// Each field normally holds 0 (dark) or 1 (light), but the raw value is kept
/// so that an unexpected value still registers as a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThemeState {
    /// "Apps use light theme"
    pub apps: u32,
    /// "System uses light theme"
    pub system: u32,
}

impl ThemeState {
    pub const fn new(apps: u32, system: u32) -> Self {
        Self { apps, system }
    }

    /// Both flags pinned to the same mode.
    pub const fn uniform(mode: ThemeMode) -> Self {
        let value = match mode {
            ThemeMode::Dark => DARK_VALUE,
            ThemeMode::Light => LIGHT_VALUE,
        };
        Self::new(value, value)
    }

    /// Mode shown to the user, derived from the apps flag.
    pub fn mode(&self) -> ThemeMode {
        ThemeMode::from_raw(self.apps)
    }

    /// True when both flags already equal `target`.
    pub fn matches(&self, target: ThemeMode) -> bool {
        self.apps == target.value() && self.system == target.value()
    }

    /// Human readable before/after description used for log rows.
    pub fn describe_transition(&self, new: &ThemeState) -> String {
        format!(
            "Apps: {} -> {}, System: {} -> {}",
            self.apps, new.apps, self.system, new.system
        )
    }
}

impl Default for ThemeState {
    /// The safe fallback when the store can't be read: dark everywhere.
    fn default() -> Self {
        Self::uniform(ThemeMode::Dark)
    }
}

impl fmt::Display for ThemeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{apps: {}, system: {}}}", self.apps, self.system)
    }
}

/// Persistence mode: whether to keep forcing `target` back into the store.
///
/// Lives only in memory; every process start begins disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub target: ThemeMode,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target: ThemeMode::Dark,
        }
    }
}
