//! Integration tests for the change history and its CSV export
//!
//! These tests verify:
//! - Queries are newest first and bounded by the limit
//! - Clearing empties the history
//! - Several handles on one file can write concurrently
//! - Exported CSV matches the stored rows

use camino::Utf8PathBuf;
use std::fs;
use std::thread;
use tempfile::TempDir;
use themewatch::models::{NewLogEntry, PERSISTENCE_SOURCE, ThemeState};
use themewatch::services::ChangeLogStore;
use themewatch::services::export::{CSV_HEADER, export_logs};

fn store() -> (ChangeLogStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().join("data").join("logs.db")).unwrap();
    (ChangeLogStore::open(&path).unwrap(), temp_dir)
}

fn light_to_dark(source: &str) -> NewLogEntry {
    NewLogEntry::for_transition(&ThemeState::new(1, 1), &ThemeState::new(0, 0), source)
}

fn dark_to_light(source: &str) -> NewLogEntry {
    NewLogEntry::for_transition(&ThemeState::new(0, 0), &ThemeState::new(1, 1), source)
}

#[test]
fn test_query_limit_and_order() {
    let (store, _temp_dir) = store();

    for i in 0..5 {
        store.append(&dark_to_light(&format!("app{}.exe", i))).unwrap();
    }

    let all = store.query(100).unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].source_process, "app4.exe");
    assert_eq!(all[4].source_process, "app0.exe");
    assert!(all.windows(2).all(|pair| pair[0].id > pair[1].id));

    let limited = store.query(2).unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].source_process, "app4.exe");

    assert!(store.query(0).unwrap().is_empty());
}

#[test]
fn test_clear_then_query_is_empty() {
    let (store, _temp_dir) = store();
    store.append(&light_to_dark(PERSISTENCE_SOURCE)).unwrap();
    store.append(&dark_to_light("unknown")).unwrap();

    store.clear().unwrap();

    for limit in [0, 1, 10, 1000] {
        assert!(store.query(limit).unwrap().is_empty());
    }
    assert_eq!(store.count().unwrap(), 0);

    // Still usable after clearing
    store.append(&dark_to_light("unknown")).unwrap();
    assert_eq!(store.query(10).unwrap().len(), 1);
}

#[test]
fn test_independent_handles_share_history() {
    let (store, _temp_dir) = store();
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let handle = ChangeLogStore::open(store.path()).unwrap();
            thread::spawn(move || {
                for i in 0..10 {
                    handle
                        .append(&dark_to_light(&format!("writer{}-{}", t, i)))
                        .unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(store.count().unwrap(), 40);
}

#[test]
fn test_export_matches_history() {
    let (store, temp_dir) = store();
    store.append(&dark_to_light("explorer.exe")).unwrap();
    store.append(&light_to_dark(PERSISTENCE_SOURCE)).unwrap();

    let entries = store.query(1000).unwrap();
    let path = Utf8PathBuf::try_from(temp_dir.path().join("export.csv")).unwrap();
    assert!(export_logs(&entries, &path).unwrap());

    let csv = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].contains(",Dark,persistence enforcement,\"Apps: 1 -> 0, System: 1 -> 0\""));
    assert!(lines[2].contains(",Light,explorer.exe,\"Apps: 0 -> 1, System: 0 -> 1\""));
}
