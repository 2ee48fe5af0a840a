// State management module
//
// This module provides MonitorState, the engine's cached view of the world
// (last known theme, monitoring flag, persistence mode) behind an RwLock, with
// change events for whoever is displaying it.

use crate::models::{PersistenceConfig, ThemeMode, ThemeState};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when the monitor's state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The cached theme moved to a new value
    ThemeChanged {
        old: ThemeState,
        new: ThemeState,
        source: String,
    },

    /// The polling loop was started
    MonitoringStarted,

    /// The polling loop was stopped
    MonitoringStopped,

    /// Persistence mode was switched on/off or retargeted
    PersistenceChanged { enabled: bool, target: ThemeMode },
}

/// Snapshot of everything the presentation layer shows.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorSnapshot {
    /// Last theme seen by the polling loop
    pub current_theme: ThemeState,
    pub is_monitoring: bool,
    pub persistence: PersistenceConfig,
}

impl MonitorSnapshot {
    fn new(initial_theme: ThemeState) -> Self {
        Self {
            current_theme: initial_theme,
            is_monitoring: false,
            persistence: PersistenceConfig::default(),
        }
    }
}

/// Thread-safe monitor state with event emission
///
/// Each field has exactly one writer:
/// - `current_theme`: the polling loop ([`record_theme`](Self::record_theme))
/// - `is_monitoring`: engine start/stop
/// - `persistence`: explicit enable/disable calls
///
/// Everything else only reads, through [`snapshot`](Self::snapshot) or
/// [`read`](Self::read).
pub struct MonitorState {
    state: Arc<RwLock<MonitorSnapshot>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl MonitorState {
    /// Create a new MonitorState seeded with the theme read at startup
    pub fn new(initial_theme: ThemeState) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(MonitorSnapshot::new(initial_theme))),
            state_tx,
        }
    }

    /// Cloned copy of the current state
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&MonitorSnapshot) -> R,
    {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Apply `update_fn`, then emit an event for every field that changed
    fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut MonitorSnapshot),
    {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        drop(state);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &MonitorSnapshot, new: &MonitorSnapshot) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.is_monitoring != new.is_monitoring {
            changes.push(if new.is_monitoring {
                StateChange::MonitoringStarted
            } else {
                StateChange::MonitoringStopped
            });
        }

        if old.persistence != new.persistence {
            changes.push(StateChange::PersistenceChanged {
                enabled: new.persistence.enabled,
                target: new.persistence.target,
            });
        }

        changes
    }

    pub fn current_theme(&self) -> ThemeState {
        self.read(|s| s.current_theme)
    }

    pub fn persistence(&self) -> PersistenceConfig {
        self.read(|s| s.persistence)
    }

    pub fn is_monitoring(&self) -> bool {
        self.read(|s| s.is_monitoring)
    }

    /// Record a theme observed by the polling loop.
    ///
    /// Emits `ThemeChanged` (with `source`) only when the value differs from
    /// the cache.
    pub fn record_theme(&self, new: ThemeState, source: &str) -> Vec<StateChange> {
        let mut old_theme = None;
        let mut changes = self.update(|state| {
            if state.current_theme != new {
                old_theme = Some(state.current_theme);
                state.current_theme = new;
            }
        });

        if let Some(old) = old_theme {
            let event = StateChange::ThemeChanged {
                old,
                new,
                source: source.to_string(),
            };
            let _ = self.state_tx.send(event.clone());
            changes.push(event);
        }

        changes
    }

    pub fn set_monitoring(&self, is_monitoring: bool) -> Vec<StateChange> {
        self.update(|state| state.is_monitoring = is_monitoring)
    }

    pub fn enable_persistence(&self, target: ThemeMode) -> Vec<StateChange> {
        self.update(|state| {
            state.persistence = PersistenceConfig {
                enabled: true,
                target,
            };
        })
    }

    /// Switch persistence off, keeping the last target for display.
    pub fn disable_persistence(&self) -> Vec<StateChange> {
        self.update(|state| state.persistence.enabled = false)
    }
}

impl Clone for MonitorState {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = MonitorState::new(ThemeState::new(1, 0));
        let snapshot = state.snapshot();

        assert_eq!(snapshot.current_theme, ThemeState::new(1, 0));
        assert!(!snapshot.is_monitoring);
        assert!(!snapshot.persistence.enabled);
    }

    #[test]
    fn test_record_theme_emits_only_on_change() {
        let state = MonitorState::new(ThemeState::new(0, 0));

        let changes = state.record_theme(ThemeState::new(0, 0), "unknown");
        assert!(changes.is_empty());

        let changes = state.record_theme(ThemeState::new(1, 1), "explorer.exe");
        assert_eq!(
            changes,
            vec![StateChange::ThemeChanged {
                old: ThemeState::new(0, 0),
                new: ThemeState::new(1, 1),
                source: "explorer.exe".to_string(),
            }]
        );
        assert_eq!(state.current_theme(), ThemeState::new(1, 1));
    }

    #[test]
    fn test_monitoring_events() {
        let state = MonitorState::new(ThemeState::default());

        assert_eq!(state.set_monitoring(true), vec![StateChange::MonitoringStarted]);
        assert!(state.set_monitoring(true).is_empty());
        assert_eq!(state.set_monitoring(false), vec![StateChange::MonitoringStopped]);
    }

    #[test]
    fn test_persistence_events() {
        let state = MonitorState::new(ThemeState::default());

        let changes = state.enable_persistence(ThemeMode::Light);
        assert_eq!(
            changes,
            vec![StateChange::PersistenceChanged {
                enabled: true,
                target: ThemeMode::Light,
            }]
        );

        let changes = state.disable_persistence();
        assert!(matches!(
            changes[0],
            StateChange::PersistenceChanged { enabled: false, target: ThemeMode::Light }
        ));
        assert!(state.disable_persistence().is_empty());
    }

    #[test]
    fn test_subscribe_to_changes() {
        let state = MonitorState::new(ThemeState::default());
        let mut rx = state.subscribe();

        state.record_theme(ThemeState::new(1, 1), "unknown");

        let event = rx.try_recv();
        assert!(matches!(event, Ok(StateChange::ThemeChanged { .. })));
    }

    #[test]
    fn test_clone_shares_state() {
        let state1 = MonitorState::new(ThemeState::default());
        let state2 = state1.clone();

        state1.enable_persistence(ThemeMode::Dark);
        assert!(state2.persistence().enabled);
    }
}
