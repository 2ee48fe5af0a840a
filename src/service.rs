//! Narrow interface the presentation layer talks to.

use crate::metrics::Metrics;
use crate::models::{LogEntry, ThemeMode, ThemeState};
use crate::monitor::MonitorEngine;
use crate::state::{MonitorSnapshot, StateChange};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Lifecycle wrapper around the [`MonitorEngine`].
///
/// Holds nothing but the engine; every call delegates.
#[derive(Clone)]
pub struct ThemeService {
    engine: Arc<MonitorEngine>,
}

impl ThemeService {
    pub fn new(engine: MonitorEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Start monitoring. Calling it again while running has no effect.
    pub fn start(&self) {
        self.engine.start_monitoring();
    }

    /// Stop enforcing and monitoring, waiting for both loops to exit.
    pub async fn stop(&self) {
        self.engine.shutdown().await;
    }

    pub fn enable_persistence(&self, mode: ThemeMode) {
        self.engine.enable_persistence(mode);
    }

    pub fn disable_persistence(&self) {
        self.engine.disable_persistence();
    }

    /// Live value of both appearance flags.
    pub fn get_current_theme(&self) -> ThemeState {
        self.engine.current_theme()
    }

    /// Returns false when the write failed; the caller tells the user.
    pub fn set_theme(&self, mode: ThemeMode) -> bool {
        self.engine.set_theme(mode)
    }

    pub fn get_logs(&self, limit: usize) -> Vec<LogEntry> {
        self.engine.get_logs(limit)
    }

    pub fn clear_logs(&self) -> bool {
        self.engine.clear_logs()
    }

    /// Cached status for display.
    pub fn status(&self) -> MonitorSnapshot {
        self.engine.state().snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.engine.state().subscribe()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.engine.metrics()
    }

    pub fn engine(&self) -> &MonitorEngine {
        &self.engine
    }
}
