//! Services module - side-effecting building blocks the monitor engine is made of.
//!
//! Everything here is framework-agnostic and synchronous; the engine decides
//! which thread each call runs on.
//!
//! # Components
//!
//! - [`SettingStore`]: reads and writes the two appearance flags and announces
//!   changes. Sits on a [`SettingBackend`]:
//!   - [`setting_store::RegistryBackend`] (Windows, per-user registry hive)
//!   - [`MemoryBackend`] (in-memory namespace for tests and other platforms)
//! - [`ChangeLogStore`]: append-only SQLite history of observed changes.
//! - [`ProcessAttributor`]: best-effort guess at which process made a change.
//! - [`StartupRegistrar`]: run-at-login registration.
//! - [`export`]: CSV export of the history.

pub mod attribution;
pub mod change_log;
pub mod export;
pub mod setting_store;
pub mod startup;

pub use attribution::{AttributionError, ProcessAttributor, ProcessSource, SystemProcesses};
pub use change_log::{ChangeLogError, ChangeLogStore};
pub use setting_store::{
    MemoryBackend, SettingBackend, SettingStore, SettingStoreError, default_backend,
};
pub use startup::StartupRegistrar;
