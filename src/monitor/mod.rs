//! The monitor engine: change detection, history and persistence mode.
//!
//! Two independent loops run on the tokio runtime once everything is started:
//!
//! - **Polling loop**: reads the appearance flags every `poll_interval`,
//!   compares them to the cached [`ThemeState`], and on a difference blames a
//!   process (see [`crate::services::attribution`]), appends a history row and
//!   updates the cache. A failed iteration is logged and followed by the longer
//!   `error_backoff` pause; the loop never ends on its own.
//! - **Persistence loop**: spawned the first time persistence mode is enabled
//!   and then left idling while it is disabled. Every `persistence_interval` it
//!   rewrites the target theme if either flag drifted, broadcasts the change,
//!   and logs the correction under [`PERSISTENCE_SOURCE`].
//!
//! Each iteration body runs on the blocking pool, so registry, SQLite and
//! process-table calls never stall the async workers, and a panicking iteration
//! is reported like any other iteration error.
//!
//! # Self-inflicted changes
//!
//! A persistence correction is logged by the persistence loop. The polling loop
//! would otherwise see the same transition and log it a second time, so the
//! enforcement write and a note of the written state happen under a gate that
//! the polling loop also holds while it reads. A polled state matching a noted
//! enforcement write updates the cache without a new row.
//!
//! # Stopping
//!
//! Cancellation is cooperative: a `watch` signal is checked between iterations
//! and races the inter-iteration sleep. [`MonitorEngine::stop_monitoring`] and
//! [`MonitorEngine::shutdown`] wait up to `stop_timeout` for a loop to finish.
//! An iteration already in flight (for example a broadcast waiting on a hung
//! window) is allowed to complete, so under heavy scheduling pressure the wait
//! can expire first; that is logged and the loop exits at its next boundary.

use crate::metrics::Metrics;
use crate::models::{
    LogEntry, MonitorSettings, NewLogEntry, PERSISTENCE_SOURCE, ThemeMode, ThemeState,
};
use crate::services::attribution::ProcessAttributor;
use crate::services::change_log::ChangeLogStore;
use crate::services::setting_store::{SettingStore, SettingStoreError};
use crate::state::MonitorState;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Errors that end a single loop iteration
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to read theme: {0}")]
    Read(#[from] SettingStoreError),

    #[error("Failed to write {0} theme")]
    Write(ThemeMode),
}

/// What one polling iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Live state equals the cache
    Unchanged,
    /// A change was logged with this attribution and cached
    Logged { old: ThemeState, new: ThemeState, source: String },
    /// A persistence correction was cached without a second row
    Absorbed { old: ThemeState, new: ThemeState },
}

/// What one persistence iteration did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforceOutcome {
    /// Persistence mode is off
    Idle,
    /// Both flags already match the target
    InSync,
    /// The target was written back
    Corrected { from: ThemeState, to: ThemeState },
}

/// State shared by the engine and both loops
struct EngineCore {
    store: SettingStore,
    log: ChangeLogStore,
    attributor: ProcessAttributor,
    state: MonitorState,
    metrics: Arc<Metrics>,
    /// Enforcement writes not yet seen by the polling loop, one per target,
    /// so at most two. Holding the lock serializes an enforcement write
    /// against a polling read.
    write_gate: Mutex<Vec<ThemeState>>,
}

impl EngineCore {
    fn gate(&self) -> MutexGuard<'_, Vec<ThemeState>> {
        self.write_gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a history row; failures are logged and the row is dropped.
    fn append(&self, entry: &NewLogEntry) -> bool {
        match self.log.append(entry) {
            Ok(()) => true,
            Err(e) => {
                self.metrics.record_log_write_failure();
                tracing::error!("Failed to log theme change: {}", e);
                false
            }
        }
    }

    fn poll_once(&self) -> Result<PollOutcome, MonitorError> {
        self.metrics.record_poll();

        let (new, self_inflicted) = {
            let mut enforced = self.gate();
            let new = self.store.try_read().inspect_err(|_| {
                self.metrics.record_read_failure();
            })?;
            let self_inflicted = enforced.contains(&new);
            enforced.clear();
            (new, self_inflicted)
        };

        let old = self.state.current_theme();
        if new == old {
            return Ok(PollOutcome::Unchanged);
        }

        if self_inflicted {
            tracing::debug!("Theme {} -> {} came from persistence enforcement", old, new);
            self.state.record_theme(new, PERSISTENCE_SOURCE);
            self.metrics.record_change_absorbed();
            return Ok(PollOutcome::Absorbed { old, new });
        }

        let source = self.attributor.attribute();
        if self.append(&NewLogEntry::for_transition(&old, &new, &source)) {
            self.metrics.record_change_logged();
        }
        self.state.record_theme(new, &source);

        Ok(PollOutcome::Logged { old, new, source })
    }

    fn enforce_once(&self) -> Result<EnforceOutcome, MonitorError> {
        let persistence = self.state.persistence();
        if !persistence.enabled {
            return Ok(EnforceOutcome::Idle);
        }

        let target = persistence.target;
        let to = ThemeState::uniform(target);

        let from = {
            let mut enforced = self.gate();
            let current = self.store.try_read().inspect_err(|_| {
                self.metrics.record_read_failure();
            })?;
            if current.matches(target) {
                return Ok(EnforceOutcome::InSync);
            }
            if !self.store.write(target) {
                return Err(MonitorError::Write(target));
            }
            if !enforced.contains(&to) {
                enforced.push(to);
            }
            current
        };

        // Outside the gate: a hung window must not hold up polling.
        self.store.broadcast();
        self.metrics.record_correction();
        self.append(&NewLogEntry::for_transition(&from, &to, PERSISTENCE_SOURCE));

        Ok(EnforceOutcome::Corrected { from, to })
    }
}

struct LoopHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    fn is_alive(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Drive `iteration` until cancelled, pausing `interval` after a successful
/// iteration and `backoff` after a failed one.
async fn run_loop<T, F>(
    name: &'static str,
    core: Arc<EngineCore>,
    mut cancel_rx: watch::Receiver<bool>,
    interval: Duration,
    backoff: Duration,
    iteration: F,
) where
    T: Send + 'static,
    F: Fn(&EngineCore) -> Result<T, MonitorError> + Copy + Send + 'static,
{
    tracing::debug!("{} loop started", name);

    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let iteration_core = Arc::clone(&core);
        let result = tokio::task::spawn_blocking(move || iteration(&iteration_core)).await;

        let delay = match result {
            Ok(Ok(_)) => interval,
            Ok(Err(e)) => {
                core.metrics.record_loop_error();
                tracing::error!("Error in {} loop: {}", name, e);
                backoff
            }
            Err(e) => {
                core.metrics.record_loop_error();
                tracing::error!("{} loop iteration aborted: {}", name, e);
                backoff
            }
        };

        tokio::select! {
            changed = cancel_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("{} loop exited", name);
}

async fn stop_loop(name: &str, handle: LoopHandle, timeout: Duration) {
    let _ = handle.cancel_tx.send(true);

    match tokio::time::timeout(timeout, handle.task).await {
        Ok(Ok(())) => tracing::debug!("{} loop joined", name),
        Ok(Err(e)) => tracing::warn!("{} loop ended abnormally: {}", name, e),
        Err(_) => tracing::warn!(
            "{} loop did not stop within {:?}; it will exit after its current iteration",
            name,
            timeout
        ),
    }
}

/// Owns the cached theme, the persistence switch and both loops.
pub struct MonitorEngine {
    core: Arc<EngineCore>,
    settings: MonitorSettings,
    runtime: Handle,
    polling: Mutex<Option<LoopHandle>>,
    persistence: Mutex<Option<LoopHandle>>,
}

impl MonitorEngine {
    /// Build an engine and seed its cache with the current theme.
    ///
    /// The change log must already be open; failing to create it is the one
    /// startup error the application can't continue past.
    pub fn new(
        store: SettingStore,
        log: ChangeLogStore,
        attributor: ProcessAttributor,
        settings: MonitorSettings,
        runtime: Handle,
    ) -> Self {
        let initial = store.read();
        tracing::info!("Initial theme: {} ({})", initial, initial.mode());

        let core = EngineCore {
            store,
            log,
            attributor,
            state: MonitorState::new(initial),
            metrics: Arc::new(Metrics::new()),
            write_gate: Mutex::new(Vec::new()),
        };

        Self {
            core: Arc::new(core),
            settings,
            runtime,
            polling: Mutex::new(None),
            persistence: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.core.state
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.core.metrics)
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    fn lock_loop(slot: &Mutex<Option<LoopHandle>>) -> MutexGuard<'_, Option<LoopHandle>> {
        slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start the polling loop. Returns false if it was already running.
    pub fn start_monitoring(&self) -> bool {
        let mut polling = Self::lock_loop(&self.polling);
        if polling.as_ref().is_some_and(LoopHandle::is_alive) {
            tracing::debug!("Theme monitoring already running");
            return false;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = self.runtime.spawn(run_loop(
            "monitoring",
            Arc::clone(&self.core),
            cancel_rx,
            self.settings.poll_interval(),
            self.settings.error_backoff(),
            EngineCore::poll_once,
        ));
        *polling = Some(LoopHandle { cancel_tx, task });
        drop(polling);

        self.core.state.set_monitoring(true);
        tracing::info!("Theme monitoring started");
        true
    }

    /// Stop the polling loop, waiting up to `stop_timeout` for it to exit.
    pub async fn stop_monitoring(&self) {
        let handle = Self::lock_loop(&self.polling).take();
        let Some(handle) = handle else {
            return;
        };

        self.core.state.set_monitoring(false);
        stop_loop("monitoring", handle, self.settings.stop_timeout()).await;
        tracing::info!("Theme monitoring stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        Self::lock_loop(&self.polling)
            .as_ref()
            .is_some_and(LoopHandle::is_alive)
    }

    /// Pin both flags to `target`, starting the persistence loop if needed.
    pub fn enable_persistence(&self, target: ThemeMode) {
        self.core.state.enable_persistence(target);

        let mut persistence = Self::lock_loop(&self.persistence);
        if !persistence.as_ref().is_some_and(LoopHandle::is_alive) {
            let (cancel_tx, cancel_rx) = watch::channel(false);
            let interval = self.settings.persistence_interval();
            let task = self.runtime.spawn(run_loop(
                "persistence",
                Arc::clone(&self.core),
                cancel_rx,
                interval,
                interval,
                EngineCore::enforce_once,
            ));
            *persistence = Some(LoopHandle { cancel_tx, task });
        }

        tracing::info!("Persistence enabled for {} theme", target);
    }

    /// Stop enforcing. The persistence loop keeps idling so re-enabling is instant.
    pub fn disable_persistence(&self) {
        self.core.state.disable_persistence();
        tracing::info!("Persistence disabled");
    }

    pub fn is_persistence_loop_alive(&self) -> bool {
        Self::lock_loop(&self.persistence)
            .as_ref()
            .is_some_and(LoopHandle::is_alive)
    }

    /// Live read of the setting store (dark/dark if it can't be read).
    pub fn current_theme(&self) -> ThemeState {
        self.core.store.read()
    }

    /// Theme last seen by the polling loop.
    pub fn cached_theme(&self) -> ThemeState {
        self.core.state.current_theme()
    }

    /// Manually write `mode` and broadcast it. The polling loop logs the change.
    pub fn set_theme(&self, mode: ThemeMode) -> bool {
        self.core.store.apply(mode)
    }

    /// Up to `limit` history rows, newest first. Empty if the store fails.
    pub fn get_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.core.log.query(limit).unwrap_or_else(|e| {
            tracing::error!("Failed to get logs: {}", e);
            Vec::new()
        })
    }

    pub fn clear_logs(&self) -> bool {
        match self.core.log.clear() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to clear logs: {}", e);
                false
            }
        }
    }

    /// Run one polling iteration on the calling thread.
    pub fn poll_once(&self) -> Result<PollOutcome, MonitorError> {
        self.core.poll_once()
    }

    /// Run one persistence iteration on the calling thread.
    pub fn enforce_once(&self) -> Result<EnforceOutcome, MonitorError> {
        self.core.enforce_once()
    }

    /// Disable persistence and stop both loops.
    pub async fn shutdown(&self) {
        self.disable_persistence();
        self.stop_monitoring().await;

        let handle = Self::lock_loop(&self.persistence).take();
        if let Some(handle) = handle {
            stop_loop("persistence", handle, self.settings.stop_timeout()).await;
        }

        self.core.metrics.log_summary();
    }
}

impl Drop for MonitorEngine {
    fn drop(&mut self) {
        // Detached loops still observe the signal and exit at their next boundary.
        for slot in [&self.polling, &self.persistence] {
            if let Some(handle) = Self::lock_loop(slot).as_ref() {
                let _ = handle.cancel_tx.send(true);
            }
        }
    }
}
