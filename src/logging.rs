use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

/// Maximum size per log file before rotation (~5 MB)
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Number of rotated log files to keep
const MAX_LOG_FILES: usize = 5;
/// In-memory log buffer cap (read back by the consumer)
const MAX_MEMORY_LOGS: usize = 2000;

static LOG_STATE: OnceLock<LogState> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

pub struct LogState {
    pub logs: Mutex<Vec<LogEntry>>,
    pub log_dir: Mutex<Option<PathBuf>>,
    pub debug_mode: AtomicBool,
}

impl LogState {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(Vec::new()),
            log_dir: Mutex::new(None),
            debug_mode: AtomicBool::new(false),
        }
    }

    /// Point the persistent log at `log_dir`, creating it if needed.
    pub fn init_log_dir(&self, log_dir: &Path) {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("[LogState] Failed to create log directory {:?}: {}", log_dir, e);
            return;
        }

        if let Ok(mut dir) = self.log_dir.lock() {
            *dir = Some(log_dir.to_path_buf());
        }

        // Write a startup marker
        self.write_to_file(
            "INFO",
            &format!(
                "=== RagePad session started at {} ===",
                Local::now().format("%Y-%m-%d %H:%M:%S %Z")
            ),
        );
    }

    /// The current (active) log file path.
    pub fn current_log_path(&self) -> Option<PathBuf> {
        self.log_dir.lock().ok()?.as_ref().map(|d| d.join("ragepad.log"))
    }

    pub fn get_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.lock().ok()?.clone()
    }

    /// Rotate log files: ragepad.log → ragepad.1.log → ragepad.2.log → …
    fn rotate_if_needed(&self) {
        let Some(current) = self.current_log_path() else { return };
        let file_size = fs::metadata(&current).map(|m| m.len()).unwrap_or(0);
        if file_size < MAX_LOG_FILE_SIZE {
            return;
        }

        let Some(dir) = self.get_log_dir() else { return };

        for i in (1..MAX_LOG_FILES).rev() {
            let from = dir.join(format!("ragepad.{}.log", i));
            let to = dir.join(format!("ragepad.{}.log", i + 1));
            let _ = fs::rename(&from, &to);
        }
        let _ = fs::rename(&current, dir.join("ragepad.1.log"));
    }

    fn write_to_file(&self, level: &str, message: &str) {
        self.rotate_if_needed();
        let Some(path) = self.current_log_path() else { return };

        let line = format!(
            "[{}] [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            message
        );

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = file.write_all(line.as_bytes());
        }
    }

    /// Core logging method: writes to memory and file.
    pub fn add_log(&self, level: &str, message: &str) {
        if level == "DEBUG" && !self.is_debug() {
            return;
        }

        let entry = LogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            level: level.to_string(),
            message: message.to_string(),
        };

        if let Ok(mut logs) = self.logs.lock() {
            logs.push(entry);
            if logs.len() > MAX_MEMORY_LOGS {
                let drain_count = MAX_MEMORY_LOGS / 5;
                logs.drain(..drain_count);
            }
        }

        self.write_to_file(level, message);
    }

    /// Most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        let start = logs.len().saturating_sub(limit);
        logs[start..].to_vec()
    }

    pub fn is_debug(&self) -> bool {
        self.debug_mode.load(Ordering::Relaxed)
    }

    pub fn set_debug(&self, enabled: bool) {
        let was = self.debug_mode.swap(enabled, Ordering::Relaxed);
        if was != enabled {
            log::set_max_level(if enabled { LevelFilter::Debug } else { LevelFilter::Info });
            self.add_log(
                "INFO",
                &format!("Debug mode {}", if enabled { "ENABLED" } else { "DISABLED" }),
            );
        }
    }
}

impl Default for LogState {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for LogState {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info || self.is_debug()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug | Level::Trace => "DEBUG",
        };
        self.add_log(level, &format!("[{}] {}", record.target(), record.args()));
    }

    fn flush(&self) {}
}

/// Install the process-wide logger. Later calls return the already
/// installed state untouched.
pub fn init(log_dir: &Path, debug: bool) -> &'static LogState {
    let mut fresh = false;
    let state = LOG_STATE.get_or_init(|| {
        fresh = true;
        LogState::new()
    });

    if fresh {
        state.init_log_dir(log_dir);
        state.debug_mode.store(debug, Ordering::Relaxed);
        if log::set_logger(state).is_ok() {
            log::set_max_level(if debug { LevelFilter::Debug } else { LevelFilter::Info });
        }
    }
    state
}

/// The installed logger, if `init` has run.
pub fn state() -> Option<&'static LogState> {
    LOG_STATE.get()
}
