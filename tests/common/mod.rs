#![allow(dead_code)]

use async_trait::async_trait;
use ragepad_lib::commands::AppState;
use ragepad_lib::config::{ForceStopPolicy, PlayerConfig};
use ragepad_lib::error::{PlayerError, Result};
use ragepad_lib::lifecycle::Coordinator;
use ragepad_lib::process::ProcessControl;
use ragepad_lib::remote::{PipeClient, PipeConnector, PipeStream};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

pub const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Soundlist>
  <Sound url="C:\Sounds\airhorn.mp3" title="Airhorn"/>
  <Sound url="C:\Sounds\memes\bruh.mp3" customTag="Bruh"/>
  <Sound url="C:\Sounds\boom.mp3"/>
  <Categories>
    <Category name="All sounds" hidden="true">
      <Sound id="0"/>
      <Sound id="1"/>
      <Sound id="2"/>
    </Category>
    <Category name="Parent" icon="star">
      <Category name="SubA">
        <Sound id="0"/>
        <Sound id="2"/>
      </Category>
      <Category name="SubB"/>
    </Category>
    <Category name="Memes">
      <Sound id="1"/>
    </Category>
  </Categories>
</Soundlist>
"#;

pub const LIVE: &str = r#"<Soundlist>
<Sound index="1" url="C:\Sounds\airhorn.mp3" title="Airhorn" playCount="3"/>
<Sound index="2" url="C:\Sounds\memes\bruh.mp3" title="bruh"/>
<Sound index="3" url="C:\Sounds\boom.mp3" title="boom"/>
</Soundlist>"#;

/// A player process that lives in memory.
#[derive(Default)]
pub struct FakeProcess {
    running: AtomicBool,
    pub ignores_graceful: AtomicBool,
    pub ignores_force: AtomicBool,
    pub launch_fails: AtomicBool,
    /// Launches succeed but the channel never opens
    pub never_ready: AtomicBool,
    /// The process table cannot be read
    pub query_fails: AtomicBool,
    events: Mutex<Vec<&'static str>>,
}

impl FakeProcess {
    pub fn new(running: bool) -> Arc<Self> {
        let process = Self::default();
        process.running.store(running, Ordering::SeqCst);
        Arc::new(process)
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn listening(&self) -> bool {
        self.running() && !self.never_ready.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl ProcessControl for FakeProcess {
    async fn is_running(&self) -> Result<bool> {
        if self.query_fails.load(Ordering::SeqCst) {
            return Err(PlayerError::Io(io::Error::other("process table unavailable")));
        }
        Ok(self.running())
    }

    async fn request_stop(&self, force: bool) -> Result<()> {
        if force {
            self.record("kill");
            if !self.ignores_force.load(Ordering::SeqCst) {
                self.running.store(false, Ordering::SeqCst);
            }
        } else {
            self.record("stop");
            if !self.ignores_graceful.load(Ordering::SeqCst) {
                self.running.store(false, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn launch(&self) -> Result<()> {
        self.record("launch");
        if self.launch_fails.load(Ordering::SeqCst) {
            return Err(PlayerError::not_found("Player executable", "fake"));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Control channel of the fake player: answers from a reply table
/// (`R-200` by default) and remembers every command it saw.
pub struct FakeConnector {
    process: Arc<FakeProcess>,
    replies: Arc<Mutex<HashMap<String, String>>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new(process: Arc<FakeProcess>) -> Arc<Self> {
        Arc::new(Self {
            process,
            replies: Arc::new(Mutex::new(HashMap::new())),
            commands: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn reply(&self, command: &str, reply: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(command.to_string(), reply.to_string());
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipeConnector for FakeConnector {
    async fn connect(&self) -> io::Result<Box<dyn PipeStream>> {
        if !self.process.listening() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "pipe not present"));
        }
        let (client, mut server) = duplex(64 * 1024);
        let replies = Arc::clone(&self.replies);
        let commands = Arc::clone(&self.commands);
        tokio::spawn(async move {
            let mut raw = Vec::new();
            let mut byte = [0u8; 1];
            while server.read(&mut byte).await.unwrap_or(0) == 1 {
                if byte[0] == 0 {
                    break;
                }
                raw.push(byte[0]);
            }
            if raw.is_empty() {
                // Probe: connect and hang up
                return;
            }
            let command = String::from_utf8_lossy(&raw).to_string();
            let reply = replies
                .lock()
                .unwrap()
                .get(&command)
                .cloned()
                .unwrap_or_else(|| "R-200".to_string());
            commands.lock().unwrap().push(command);
            let _ = server.write_all(reply.as_bytes()).await;
        });
        Ok(Box::new(client))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub config: PlayerConfig,
    pub process: Arc<FakeProcess>,
    pub connector: Arc<FakeConnector>,
}

impl Harness {
    pub fn new(running: bool) -> Self {
        Self::with_policy(running, ForceStopPolicy::Proceed)
    }

    pub fn with_policy(running: bool, policy: ForceStopPolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let document_path = dir.path().join("soundlist.spl");
        std::fs::write(&document_path, DOC).unwrap();

        let config = PlayerConfig {
            executable: PathBuf::from("/fake/player"),
            process_name: "player".into(),
            document_path,
            pipe_address: "fake".into(),
            sounds_dir: dir.path().join("sounds"),
            log_dir: dir.path().join("logs"),
            force_stop_policy: policy,
            ..Default::default()
        };
        let process = FakeProcess::new(running);
        let connector = FakeConnector::new(Arc::clone(&process));
        Self {
            dir,
            config,
            process,
            connector,
        }
    }

    pub fn coordinator(&self) -> Coordinator {
        let client = Arc::new(PipeClient::new(self.connector.clone(), &self.config.timings));
        Coordinator::new(self.process.clone(), client, &self.config)
    }

    pub fn app(&self) -> AppState {
        AppState::new(
            self.config.clone(),
            self.process.clone(),
            self.connector.clone(),
        )
    }

    pub fn document(&self) -> String {
        std::fs::read_to_string(&self.config.document_path).unwrap()
    }
}
