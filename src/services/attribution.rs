//! Best-effort guess at which process changed the appearance setting.
//!
//! The setting store does not record who wrote to it, so this is a heuristic:
//! at detection time the process table is scanned for a short list of programs
//! known to change the theme, and the first one found is blamed. The answer is
//! not necessarily the real writer and carries no confidence score. When nothing
//! matches, or the scan fails, the result is [`UNKNOWN_SOURCE`].

use crate::models::UNKNOWN_SOURCE;
use thiserror::Error;

/// Upper bound on process entries inspected per scan.
pub const MAX_SCANNED_PROCESSES: usize = 4096;

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Failed to enumerate processes: {0}")]
    Enumeration(#[from] std::io::Error),

    #[error("Process enumeration is not supported on this platform")]
    Unsupported,
}

/// Anything that can list running process names.
pub trait ProcessSource: Send + Sync {
    fn process_names(&self) -> Result<Vec<String>, AttributionError>;
}

/// Matches running processes against a list of likely theme writers.
pub struct ProcessAttributor {
    source: Box<dyn ProcessSource>,
    /// Lowercased candidate names, in priority order.
    candidates: Vec<String>,
}

impl ProcessAttributor {
    pub fn new(source: Box<dyn ProcessSource>, candidates: &[String]) -> Self {
        Self {
            source,
            candidates: candidates.iter().map(|c| c.to_lowercase()).collect(),
        }
    }

    /// Attributor over the real process table.
    pub fn system(candidates: &[String]) -> Self {
        Self::new(Box::new(SystemProcesses), candidates)
    }

    /// Name of the first running candidate, or `"unknown"`.
    ///
    /// Never fails: enumeration errors are logged and reported as unknown.
    pub fn attribute(&self) -> String {
        let names = match self.source.process_names() {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Failed to detect source process: {}", e);
                return UNKNOWN_SOURCE.to_string();
            }
        };

        names
            .into_iter()
            .take(MAX_SCANNED_PROCESSES)
            .find(|name| self.candidates.contains(&name.to_lowercase()))
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
    }
}

/// The live process table of this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcesses;

impl ProcessSource for SystemProcesses {
    #[cfg(windows)]
    fn process_names(&self) -> Result<Vec<String>, AttributionError> {
        windows_process_names()
    }

    #[cfg(target_os = "linux")]
    fn process_names(&self) -> Result<Vec<String>, AttributionError> {
        linux_process_names()
    }

    #[cfg(not(any(windows, target_os = "linux")))]
    fn process_names(&self) -> Result<Vec<String>, AttributionError> {
        Err(AttributionError::Unsupported)
    }
}

#[cfg(windows)]
fn windows_process_names() -> Result<Vec<String>, AttributionError> {
    use windows_sys::Win32::Foundation::{CloseHandle, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };

    // SAFETY: plain FFI call, the returned handle is checked and closed below.
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) };
    if snapshot == INVALID_HANDLE_VALUE {
        return Err(std::io::Error::last_os_error().into());
    }

    // SAFETY: PROCESSENTRY32W is plain data; all-zero is a valid bit pattern.
    let mut entry: PROCESSENTRY32W = unsafe { std::mem::zeroed() };
    entry.dwSize = std::mem::size_of::<PROCESSENTRY32W>() as u32;

    let mut names = Vec::new();
    // SAFETY: `snapshot` is a valid snapshot handle and `entry.dwSize` is set.
    let mut more = unsafe { Process32FirstW(snapshot, &mut entry) } != 0;
    while more && names.len() < MAX_SCANNED_PROCESSES {
        let len = entry
            .szExeFile
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(entry.szExeFile.len());
        names.push(String::from_utf16_lossy(&entry.szExeFile[..len]));

        // SAFETY: same snapshot and entry as above.
        more = unsafe { Process32NextW(snapshot, &mut entry) } != 0;
    }

    // SAFETY: `snapshot` came from CreateToolhelp32Snapshot and is closed once.
    unsafe { CloseHandle(snapshot) };

    Ok(names)
}

#[cfg(target_os = "linux")]
fn linux_process_names() -> Result<Vec<String>, AttributionError> {
    use std::fs;

    let mut names = Vec::new();
    for dir_entry in fs::read_dir("/proc")? {
        if names.len() >= MAX_SCANNED_PROCESSES {
            break;
        }

        let Ok(dir_entry) = dir_entry else { continue };
        let file_name = dir_entry.file_name();
        let Some(pid) = file_name.to_str() else { continue };
        if !pid.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        // Processes can exit mid-scan; skip the ones that vanished.
        if let Ok(comm) = fs::read_to_string(dir_entry.path().join("comm")) {
            names.push(comm.trim_end().to_string());
        }
    }

    Ok(names)
}
