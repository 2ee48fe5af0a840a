// Status refresher - periodic console view of the monitor
//
// Pulls the cached status and the newest log rows through the service at the
// refresh interval and prints what changed since the last refresh. State change
// events trigger an early refresh. It only ever reads, so a slow refresh can't
// hold up the engine.

use crate::models::LogEntry;
use crate::service::ThemeService;
use crate::state::MonitorSnapshot;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// One-line summary of a status snapshot.
pub fn format_status(status: &MonitorSnapshot) -> String {
    let persistence = if status.persistence.enabled {
        format!("pinned to {}", status.persistence.target)
    } else {
        "off".to_string()
    };

    format!(
        "Theme: {} {} | Monitoring: {} | Persistence: {}",
        status.current_theme.mode(),
        status.current_theme,
        if status.is_monitoring { "on" } else { "off" },
        persistence
    )
}

pub fn format_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {} by {} ({})",
        entry.timestamp, entry.theme_mode, entry.source_process, entry.details
    )
}

/// Remembers what was last printed so each refresh only shows news.
#[derive(Debug)]
pub struct StatusView {
    last_status: Option<MonitorSnapshot>,
    last_entry_id: i64,
}

impl StatusView {
    /// Start after `entries` so history from earlier sessions isn't replayed.
    pub fn new(entries: &[LogEntry]) -> Self {
        Self {
            last_status: None,
            last_entry_id: entries.iter().map(|e| e.id).max().unwrap_or(0),
        }
    }

    /// Lines to print for this refresh, oldest news first.
    ///
    /// `entries` is newest first, as the change log returns it.
    pub fn refresh(&mut self, status: &MonitorSnapshot, entries: &[LogEntry]) -> Vec<String> {
        let mut lines = Vec::new();

        if self.last_status.as_ref() != Some(status) {
            lines.push(format_status(status));
            self.last_status = Some(status.clone());
        }

        // The database was replaced under us; ids started over.
        if entries.first().is_some_and(|newest| newest.id < self.last_entry_id) {
            self.last_entry_id = 0;
        }

        for entry in entries.iter().rev().filter(|e| e.id > self.last_entry_id) {
            lines.push(format_entry(entry));
        }
        if let Some(newest) = entries.first() {
            self.last_entry_id = self.last_entry_id.max(newest.id);
        }

        lines
    }
}

/// Background task printing [`StatusView`] refreshes to stdout.
pub struct StatusRefresher {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StatusRefresher {
    pub fn spawn(
        service: ThemeService,
        interval: Duration,
        log_limit: usize,
        runtime: &Handle,
    ) -> Self {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let mut changes = service.subscribe();

        let task = runtime.spawn(async move {
            let mut view = StatusView::new(&fetch_logs(&service, log_limit).await);
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    changed = cancel_rx.changed() => {
                        if changed.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                    event = changes.recv() => match event {
                        Ok(change) => tracing::trace!("State change received: {:?}", change),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!("Status view skipped {} state events", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }

                let entries = fetch_logs(&service, log_limit).await;
                for line in view.refresh(&service.status(), &entries) {
                    println!("{}", line);
                }
            }

            tracing::debug!("Status refresher exited");
        });

        Self { cancel_tx, task }
    }

    pub async fn stop(self) {
        let _ = self.cancel_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Status refresher ended abnormally: {}", e);
        }
    }
}

async fn fetch_logs(service: &ThemeService, limit: usize) -> Vec<LogEntry> {
    let service = service.clone();
    tokio::task::spawn_blocking(move || service.get_logs(limit))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch logs for display: {}", e);
            Vec::new()
        })
}
