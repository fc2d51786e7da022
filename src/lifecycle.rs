//! Stop → edit → relaunch → confirm, one cycle at a time.
//!
//! The player holds the soundlist open while it runs and rewrites it on
//! exit, so every edit happens with the player confirmed (or assumed)
//! stopped. The relaunch step runs whether or not the edit succeeded.

use crate::config::{ForceStopPolicy, PlayerConfig, Timings};
use crate::error::{PlayerError, Result};
use crate::process::ProcessControl;
use crate::remote::PipeClient;
use crate::spl::store::{read_document, write_document};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Where the coordinator is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Idle,
    Running,
    GracefulStopRequested,
    StillRunningAfterGraceTimeout,
    ForceStopRequested,
    Stopped,
    AssumedStopped,
    Mutating,
    Relaunching,
    PollingForReady,
    Ready,
    TimedOut,
}

/// Whether the player comes back after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelaunchPolicy {
    #[default]
    Always,
    /// Only if it was running before the edit
    IfWasRunning,
}

pub struct Coordinator {
    process: Arc<dyn ProcessControl>,
    client: Arc<PipeClient>,
    document_path: PathBuf,
    timings: Timings,
    force_stop_policy: ForceStopPolicy,
    /// Held for a whole stop/edit/relaunch cycle
    write_lock: tokio::sync::Mutex<()>,
    state: Mutex<LifecycleState>,
}

impl Coordinator {
    pub fn new(
        process: Arc<dyn ProcessControl>,
        client: Arc<PipeClient>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            process,
            client,
            document_path: config.document_path.clone(),
            timings: config.timings.clone(),
            force_stop_policy: config.force_stop_policy,
            write_lock: tokio::sync::Mutex::new(()),
            state: Mutex::new(LifecycleState::Idle),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub async fn is_running(&self) -> Result<bool> {
        self.process.is_running().await
    }

    /// A failed process query counts as running.
    async fn player_running(&self) -> bool {
        match self.process.is_running().await {
            Ok(running) => running,
            Err(e) => {
                log::warn!("Process query failed, treating the player as running: {}", e);
                true
            }
        }
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            log::debug!("Lifecycle {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    async fn wait_for_exit(&self, window: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if !self.player_running().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.timings.stop_poll()).await;
        }
    }

    /// Make sure the player is not running. Returns whether it was.
    pub async fn ensure_stopped(&self) -> Result<bool> {
        if !self.player_running().await {
            self.set_state(LifecycleState::Stopped);
            return Ok(false);
        }
        self.set_state(LifecycleState::Running);

        // 1. Polite request
        self.set_state(LifecycleState::GracefulStopRequested);
        if let Err(e) = self.process.request_stop(false).await {
            log::warn!("Graceful stop request failed: {}", e);
        }
        if self.wait_for_exit(self.timings.grace()).await {
            log::info!("Player exited");
            self.set_state(LifecycleState::Stopped);
            return Ok(true);
        }

        // 2. Escalate
        self.set_state(LifecycleState::StillRunningAfterGraceTimeout);
        log::warn!(
            "Player still running after {:?}, forcing it to stop",
            self.timings.grace()
        );
        self.set_state(LifecycleState::ForceStopRequested);
        if let Err(e) = self.process.request_stop(true).await {
            log::warn!("Forced stop request failed: {}", e);
        }
        if self.wait_for_exit(self.timings.force()).await {
            self.set_state(LifecycleState::Stopped);
            return Ok(true);
        }

        // 3. Still there
        match self.force_stop_policy {
            ForceStopPolicy::Proceed => {
                log::warn!(
                    "Player still detected {:?} after forced stop, editing anyway",
                    self.timings.force()
                );
                self.set_state(LifecycleState::AssumedStopped);
                Ok(true)
            }
            ForceStopPolicy::Fail => {
                self.set_state(LifecycleState::Running);
                Err(PlayerError::timeout(format!(
                    "player did not stop within {:?}",
                    self.timings.grace() + self.timings.force()
                )))
            }
        }
    }

    /// Launch the player and wait for its control channel to answer.
    pub async fn relaunch_and_confirm(&self) -> Result<()> {
        self.set_state(LifecycleState::Relaunching);
        if let Err(e) = self.process.launch().await {
            self.set_state(LifecycleState::TimedOut);
            return Err(e);
        }
        self.wait_until_ready().await
    }

    async fn wait_until_ready(&self) -> Result<()> {
        self.set_state(LifecycleState::PollingForReady);
        let deadline = Instant::now() + self.timings.ready_timeout();
        loop {
            if self.client.probe().await {
                log::info!("Player ready");
                self.set_state(LifecycleState::Ready);
                return Ok(());
            }
            if Instant::now() >= deadline {
                self.set_state(LifecycleState::TimedOut);
                return Err(PlayerError::timeout(format!(
                    "control channel not ready within {:?}",
                    self.timings.ready_timeout()
                )));
            }
            sleep(self.timings.ready_poll()).await;
        }
    }

    /// Start the player if needed and wait until it answers.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.process.is_running().await? {
            return self.wait_until_ready().await;
        }
        self.relaunch_and_confirm().await
    }

    /// Run `edit` against a fresh read of the soundlist with the player
    /// stopped. `edit` returns the new text and a value for the caller.
    ///
    /// An edit error is reported in preference to a relaunch error.
    pub async fn with_player_stopped<T, F>(&self, policy: RelaunchPolicy, edit: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<(String, T)> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;

        // A player that refused to stop is still running: nothing to relaunch
        let was_running = self.ensure_stopped().await?;

        self.set_state(LifecycleState::Mutating);
        let edited = self.edit_document(edit);
        if let Err(e) = &edited {
            log::error!("Soundlist edit failed: {}", e);
        }

        let relaunch = match policy {
            RelaunchPolicy::Always => true,
            RelaunchPolicy::IfWasRunning => was_running,
        };
        let relaunched = if relaunch {
            self.relaunch_and_confirm().await
        } else {
            self.set_state(LifecycleState::Stopped);
            Ok(())
        };

        match (edited, relaunched) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(relaunch_err)) => {
                log::error!("Relaunch after failed edit also failed: {}", relaunch_err);
                Err(e)
            }
        }
    }

    fn edit_document<T, F>(&self, edit: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<(String, T)>,
    {
        let text = read_document(&self.document_path)?;
        let (updated, value) = edit(&text)?;
        if updated == text {
            log::debug!("Soundlist unchanged, skipping write");
        } else {
            write_document(&self.document_path, &updated)?;
        }
        Ok(value)
    }
}
