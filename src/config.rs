use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(windows)]
const DEFAULT_PIPE_ADDRESS: &str = r"\\.\pipe\sp_remote_control";
#[cfg(windows)]
const DEFAULT_PROCESS_NAME: &str = "Soundpad.exe";
#[cfg(not(windows))]
const DEFAULT_PROCESS_NAME: &str = "Soundpad";

/// What to do when the player survives a forced termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForceStopPolicy {
    /// Log a warning and edit the soundlist anyway
    #[default]
    Proceed,
    /// Abort with `ProcessTimeout` before the soundlist is touched
    Fail,
}

/// Polling intervals and windows for the stop/relaunch cycle and the control channel.
/// All values are milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub stop_poll_ms: u64,
    pub grace_ms: u64,
    pub force_ms: u64,
    pub ready_poll_ms: u64,
    pub ready_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub status_cache_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            stop_poll_ms: 250,
            grace_ms: 6_000,
            force_ms: 3_000,
            ready_poll_ms: 500,
            ready_timeout_ms: 15_000,
            command_timeout_ms: 5_000,
            probe_timeout_ms: 500,
            status_cache_ms: 2_000,
        }
    }
}

impl Timings {
    pub fn stop_poll(&self) -> Duration {
        Duration::from_millis(self.stop_poll_ms)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn force(&self) -> Duration {
        Duration::from_millis(self.force_ms)
    }

    pub fn ready_poll(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn status_cache(&self) -> Duration {
        Duration::from_millis(self.status_cache_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Installed player executable, launched on relaunch
    pub executable: PathBuf,
    /// Name the player shows up under in the process table
    pub process_name: String,
    /// The soundlist the player owns while running
    pub document_path: PathBuf,
    /// Control channel address (named pipe on Windows, socket path elsewhere)
    pub pipe_address: String,
    /// Permanent home for imported sound files
    pub sounds_dir: PathBuf,
    pub log_dir: PathBuf,
    pub debug_logging: bool,
    pub timings: Timings,
    pub force_stop_policy: ForceStopPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            executable: default_executable(),
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            document_path: config_dir.join("Leppsoft").join("soundlist.spl"),
            pipe_address: default_pipe_address(),
            sounds_dir: data_dir.join("RagePad").join("sounds"),
            log_dir: data_dir.join("RagePad").join("logs"),
            debug_logging: false,
            timings: Timings::default(),
            force_stop_policy: ForceStopPolicy::default(),
        }
    }
}

impl PlayerConfig {
    /// Load from a JSON file. A missing file yields the defaults; anything
    /// present but unparsable is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config: PlayerConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(windows)]
fn default_executable() -> PathBuf {
    PathBuf::from(r"C:\Program Files\Soundpad\Soundpad.exe")
}

#[cfg(not(windows))]
fn default_executable() -> PathBuf {
    PathBuf::from("/usr/local/bin/soundpad")
}

#[cfg(windows)]
fn default_pipe_address() -> String {
    DEFAULT_PIPE_ADDRESS.to_string()
}

#[cfg(not(windows))]
fn default_pipe_address() -> String {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sp_remote_control.sock")
        .to_string_lossy()
        .to_string()
}
