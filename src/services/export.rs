//! CSV export of the change history.

use crate::models::LogEntry;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;

pub const CSV_HEADER: &str = "Timestamp,Theme Mode,Source Process,Details";

const HEADER_FIELDS: [&str; 4] = ["Timestamp", "Theme Mode", "Source Process", "Details"];

fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'));
    builder
}

fn write_rows<W: Write>(writer: &mut csv::Writer<W>, entries: &[LogEntry]) -> csv::Result<()> {
    writer.write_record(HEADER_FIELDS)?;
    for entry in entries {
        writer.write_record([
            entry.timestamp.as_str(),
            entry.theme_mode.as_str(),
            entry.source_process.as_str(),
            entry.details.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Render entries as CSV, one row per entry, in the order given.
///
/// Fields are quoted when they contain a delimiter or quote; the details
/// column always contains a comma and so is always quoted.
pub fn render_csv(entries: &[LogEntry]) -> Result<String> {
    let mut writer = writer_builder().from_writer(Vec::with_capacity(64 * (entries.len() + 1)));
    write_rows(&mut writer, entries).context("Failed to render CSV")?;

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("Rendered CSV is not valid UTF-8")
}

/// Default export file name, e.g. `theme_monitor_logs_20240131_235959.csv`.
pub fn default_export_file_name() -> String {
    format!(
        "theme_monitor_logs_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Where exports go when no path is given: the desktop, else `fallback_dir`.
pub fn default_export_path(fallback_dir: &Utf8Path) -> Utf8PathBuf {
    let dir = dirs::desktop_dir()
        .and_then(|p| Utf8PathBuf::try_from(p).ok())
        .filter(|p| p.exists())
        .unwrap_or_else(|| fallback_dir.to_path_buf());
    dir.join(default_export_file_name())
}

/// Write `entries` to `path` as CSV.
///
/// Returns `Ok(false)` without touching the filesystem when there is nothing
/// to export.
pub fn export_logs(entries: &[LogEntry], path: &Utf8Path) -> Result<bool> {
    if entries.is_empty() {
        tracing::info!("No logs to export");
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create export directory: {}", parent))?;
        }
    }

    let mut writer = writer_builder()
        .from_path(path)
        .with_context(|| format!("Failed to create export file: {}", path))?;
    write_rows(&mut writer, entries)
        .with_context(|| format!("Failed to write export file: {}", path))?;

    tracing::info!("Exported {} log entries to {}", entries.len(), path);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(id: i64, mode: &str, source: &str, details: &str) -> LogEntry {
        LogEntry {
            id,
            timestamp: "2024-05-01 10:00:00".to_string(),
            theme_mode: mode.to_string(),
            source_process: source.to_string(),
            details: details.to_string(),
            created_at: "2024-05-01 10:00:00".to_string(),
        }
    }

    #[test]
    fn test_render_csv() {
        let entries = vec![
            sample(2, "Dark", "persistence enforcement", "Apps: 1 -> 0, System: 1 -> 0"),
            sample(1, "Light", "explorer.exe", "Apps: 0 -> 1, System: 0 -> 1"),
        ];

        let csv = render_csv(&entries).unwrap();
        let lines: Vec<_> = csv.lines().collect();

        assert_eq!(lines[0], "Timestamp,Theme Mode,Source Process,Details");
        assert_eq!(
            lines[1],
            "2024-05-01 10:00:00,Dark,persistence enforcement,\"Apps: 1 -> 0, System: 1 -> 0\""
        );
        assert_eq!(
            lines[2],
            "2024-05-01 10:00:00,Light,explorer.exe,\"Apps: 0 -> 1, System: 0 -> 1\""
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_comma_and_quote_in_source_stay_in_one_field() {
        let entries = vec![sample(
            1,
            "Light",
            "My,Tool \"beta\".exe",
            "Apps: 0 -> 1, System: 0 -> 1",
        )];

        let csv = render_csv(&entries).unwrap();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "2024-05-01 10:00:00,Light,\"My,Tool \"\"beta\"\".exe\",\"Apps: 0 -> 1, System: 0 -> 1\""
        );

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), HEADER_FIELDS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 4);
        assert_eq!(&rows[0][2], "My,Tool \"beta\".exe");
        assert_eq!(&rows[0][3], "Apps: 0 -> 1, System: 0 -> 1");
    }

    #[test]
    fn test_export_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().join("out").join("logs.csv")).unwrap();
        let entries = vec![sample(1, "Light", "unknown", "Apps: 0 -> 1, System: 0 -> 1")];

        assert!(export_logs(&entries, &path).unwrap());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with(CSV_HEADER));
        assert!(written.contains("Light,unknown"));
    }

    #[test]
    fn test_export_nothing_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().join("logs.csv")).unwrap();

        assert!(!export_logs(&[], &path).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_default_file_name_shape() {
        let name = default_export_file_name();
        assert!(name.starts_with("theme_monitor_logs_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "theme_monitor_logs_20240101_000000.csv".len());
    }
}
