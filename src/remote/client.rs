//! Request/response client for the player's control channel.

use super::framing::ReplyDecoder;
use super::request::{PlayerRequest, ReplyStatus};
use super::transport::{PipeConnector, SystemPipeConnector};
use crate::config::{PlayerConfig, Timings};
use crate::error::{PlayerError, Result};
use serde::Serialize;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, Instant};

const READ_CHUNK: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

#[derive(Debug)]
struct ConnectionCache {
    state: ConnectionState,
    updated_at: Option<Instant>,
}

impl ConnectionCache {
    fn fresh(&self, ttl: Duration) -> Option<bool> {
        let updated_at = self.updated_at?;
        if updated_at.elapsed() > ttl {
            return None;
        }
        match self.state {
            ConnectionState::Connected => Some(true),
            ConnectionState::Disconnected => Some(false),
            ConnectionState::Unknown => None,
        }
    }
}

pub struct PipeClient {
    connector: Arc<dyn PipeConnector>,
    command_timeout: Duration,
    probe_timeout: Duration,
    cache_ttl: Duration,
    cache: Mutex<ConnectionCache>,
}

impl PipeClient {
    pub fn new(connector: Arc<dyn PipeConnector>, timings: &Timings) -> Self {
        Self {
            connector,
            command_timeout: timings.command_timeout(),
            probe_timeout: timings.probe_timeout(),
            cache_ttl: timings.status_cache(),
            cache: Mutex::new(ConnectionCache {
                state: ConnectionState::Unknown,
                updated_at: None,
            }),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        let connector = SystemPipeConnector::new(config.pipe_address.clone());
        Self::new(Arc::new(connector), &config.timings)
    }

    /// Send one raw command and wait for its reply.
    pub async fn send(&self, command: &str) -> Result<String> {
        log::debug!("-> {}", command);
        match timeout(self.command_timeout, self.exchange(command)).await {
            Ok(Ok(reply)) => {
                self.record(ConnectionState::Connected);
                log::debug!("<- {} bytes", reply.len());
                Ok(reply)
            }
            Ok(Err(e)) => {
                self.record(ConnectionState::Disconnected);
                Err(PlayerError::channel(format!("{}: {}", command, e)))
            }
            Err(_) => {
                self.record(ConnectionState::Disconnected);
                Err(PlayerError::channel(format!(
                    "{}: no reply within {:?}",
                    command, self.command_timeout
                )))
            }
        }
    }

    pub async fn request(&self, request: &PlayerRequest) -> Result<ReplyStatus> {
        let reply = self.send(&request.to_string()).await?;
        Ok(ReplyStatus::parse(&reply))
    }

    async fn exchange(&self, command: &str) -> io::Result<String> {
        let mut stream = self.connector.connect().await?;

        let mut frame = Vec::with_capacity(command.len() + 1);
        frame.extend_from_slice(command.as_bytes());
        frame.push(0);
        stream.write_all(&frame).await?;
        stream.flush().await?;

        let mut decoder = ReplyDecoder::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                // Closed: whatever arrived is the reply
                break;
            }
            if decoder.push(&buf[..n]) {
                break;
            }
        }

        if decoder.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "channel closed without a reply",
            ));
        }
        Ok(decoder.into_text())
    }

    /// Is anything listening? Bounded by the short probe timeout and never
    /// served from the cache.
    pub async fn probe(&self) -> bool {
        let connected = matches!(
            timeout(self.probe_timeout, self.connector.connect()).await,
            Ok(Ok(_))
        );
        self.record(if connected {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        });
        connected
    }

    /// Cached connectivity, refreshed by a probe once the cache goes stale.
    pub async fn is_connected(&self) -> bool {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fresh(self.cache_ttl);
        match cached {
            Some(connected) => connected,
            None => self.probe().await,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    fn record(&self, state: ConnectionState) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.state = state;
        cache.updated_at = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::PipeStream;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::duplex;

    /// Answers each connection with a canned reply after reading the command.
    struct ScriptedConnector {
        reply: Option<&'static str>,
        hold_open: bool,
        connects: AtomicUsize,
        received: Mutex<Vec<Vec<u8>>>,
    }

    impl ScriptedConnector {
        fn new(reply: Option<&'static str>, hold_open: bool) -> Arc<Self> {
            Arc::new(Self {
                reply,
                hold_open,
                connects: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PipeConnector for Arc<ScriptedConnector> {
        async fn connect(&self) -> io::Result<Box<dyn PipeStream>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let Some(reply) = self.reply else {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no pipe"));
            };
            let (client, mut server) = duplex(64 * 1024);
            let me = Arc::clone(self);
            tokio::spawn(async move {
                let mut command = Vec::new();
                let mut byte = [0u8; 1];
                while server.read(&mut byte).await.unwrap_or(0) == 1 {
                    command.push(byte[0]);
                    if byte[0] == 0 {
                        break;
                    }
                }
                me.received.lock().unwrap().push(command);
                let _ = server.write_all(reply.as_bytes()).await;
                if me.hold_open {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
            });
            Ok(Box::new(client))
        }
    }

    fn client(connector: Arc<ScriptedConnector>) -> PipeClient {
        PipeClient::new(Arc::new(connector), &Timings::default())
    }

    #[tokio::test]
    async fn sends_nul_terminated_and_reads_status() {
        let connector = ScriptedConnector::new(Some("R-200"), true);
        let client = client(connector.clone());

        let status = client.request(&PlayerRequest::PlaySound(4)).await.unwrap();
        assert_eq!(status, ReplyStatus::Ok);
        assert_eq!(
            connector.received.lock().unwrap()[0],
            b"DoPlaySound(4)\0".to_vec()
        );
        assert_eq!(client.connection_state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn close_flushes_partial_reply() {
        let connector = ScriptedConnector::new(Some("<Soundlist><Sound index=\"1\" url=\"a\"/>"), false);
        let reply = client(connector).send("GetSoundlist()").await.unwrap();
        assert_eq!(reply, "<Soundlist><Sound index=\"1\" url=\"a\"/>");
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_reply_times_out() {
        let connector = ScriptedConnector::new(Some("<Soundlist>"), true);
        let client = client(connector);
        let err = client.send("GetSoundlist()").await.unwrap_err();
        assert!(matches!(err, PlayerError::ChannelUnavailable(_)));
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn missing_pipe_is_channel_unavailable() {
        let client = client(ScriptedConnector::new(None, false));
        assert!(matches!(
            client.send("GetVolume()").await,
            Err(PlayerError::ChannelUnavailable(_))
        ));
        assert!(!client.probe().await);
    }

    #[tokio::test(start_paused = true)]
    async fn connectivity_is_cached_briefly() {
        let connector = ScriptedConnector::new(Some("R-200"), false);
        let client = client(connector.clone());

        assert!(client.is_connected().await);
        assert!(client.is_connected().await);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(2_100)).await;
        assert!(client.is_connected().await);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
    }
}
