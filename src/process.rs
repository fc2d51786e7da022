//! The player as an OS process: is it running, ask it to stop, start it.

use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use sysinfo::{ProcessStatus, ProcessesToUpdate, Signal, System};

#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Whether a player process is alive. An error means the process table
    /// could not be read, not that the player is gone.
    async fn is_running(&self) -> Result<bool>;

    /// Ask the player to exit; `force` kills it outright. Returning does not
    /// mean the process is gone.
    async fn request_stop(&self, force: bool) -> Result<()>;

    /// Start the player detached from this process. The child is reaped when
    /// it exits.
    async fn launch(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SystemProcessControl {
    executable: PathBuf,
    process_name: String,
}

impl SystemProcessControl {
    pub fn new(executable: PathBuf, process_name: impl Into<String>) -> Self {
        Self {
            executable,
            process_name: process_name.into(),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.executable.clone(), config.process_name.clone())
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let name = self.process_name.clone();
        tokio::task::spawn_blocking(move || f(&name))
            .await
            .map_err(|e| PlayerError::Io(std::io::Error::other(e)))?
    }
}

fn refreshed_system() -> System {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system
}

fn count_running(name: &str) -> usize {
    let system = refreshed_system();
    let name = OsString::from(name);
    // Exited children linger as zombies until reaped
    system
        .processes_by_exact_name(&name)
        .filter(|process| process.status() != ProcessStatus::Zombie)
        .count()
}

fn kill_all(name: &str, force: bool) -> Result<()> {
    let system = refreshed_system();
    let name = OsString::from(name);
    let mut signalled = 0;
    for process in system.processes_by_exact_name(&name) {
        let sent = if force {
            process.kill()
        } else {
            process.kill_with(Signal::Term).unwrap_or(false)
        };
        if sent {
            signalled += 1;
        }
    }
    log::debug!("Signalled {} {:?} process(es), force={}", signalled, name, force);
    Ok(())
}

#[cfg(windows)]
fn graceful_stop(name: &str) -> Result<()> {
    use std::os::windows::process::CommandExt;
    use winapi::um::winbase::CREATE_NO_WINDOW;

    // taskkill without /F posts WM_CLOSE, which lets the player save
    let output = Command::new("taskkill")
        .args(["/IM", name])
        .creation_flags(CREATE_NO_WINDOW)
        .output()?;
    if !output.status.success() {
        log::debug!(
            "taskkill /IM {} exited with {}: {}",
            name,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

#[cfg(not(windows))]
fn graceful_stop(name: &str) -> Result<()> {
    kill_all(name, false)
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    use winapi::um::winbase::{CREATE_NEW_PROCESS_GROUP, DETACHED_PROCESS};
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(any(windows, unix)))]
fn detach(_command: &mut Command) {}

#[async_trait]
impl ProcessControl for SystemProcessControl {
    async fn is_running(&self) -> Result<bool> {
        self.blocking(|name| Ok(count_running(name) > 0)).await
    }

    async fn request_stop(&self, force: bool) -> Result<()> {
        self.blocking(move |name| {
            if force {
                kill_all(name, true)
            } else {
                graceful_stop(name)
            }
        })
        .await
    }

    async fn launch(&self) -> Result<()> {
        if !self.executable.exists() {
            return Err(PlayerError::not_found(
                "Player executable",
                self.executable.display().to_string(),
            ));
        }

        let mut command = Command::new(&self.executable);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = self.executable.parent() {
            command.current_dir(dir);
        }
        detach(&mut command);

        let mut child = tokio::process::Command::from(command).spawn()?;
        log::info!("Launched {:?} (pid {:?})", self.executable, child.id());
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => log::info!("Player exited ({})", status),
                Err(e) => log::warn!("Lost track of the player process: {}", e),
            }
        });
        Ok(())
    }
}
