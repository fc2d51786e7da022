//! How bytes reach the player. The real connector opens the Windows named
//! pipe (or a Unix socket on other platforms); tests plug in in-memory streams.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

pub trait PipeStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> PipeStream for T {}

#[async_trait]
pub trait PipeConnector: Send + Sync {
    async fn connect(&self) -> io::Result<Box<dyn PipeStream>>;
}

#[derive(Debug, Clone)]
pub struct SystemPipeConnector {
    address: String,
}

impl SystemPipeConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl PipeConnector for SystemPipeConnector {
    #[cfg(windows)]
    async fn connect(&self) -> io::Result<Box<dyn PipeStream>> {
        use tokio::net::windows::named_pipe::ClientOptions;
        let client = ClientOptions::new().open(&self.address)?;
        Ok(Box::new(client))
    }

    #[cfg(unix)]
    async fn connect(&self) -> io::Result<Box<dyn PipeStream>> {
        let stream = tokio::net::UnixStream::connect(&self.address).await?;
        Ok(Box::new(stream))
    }

    #[cfg(not(any(windows, unix)))]
    async fn connect(&self) -> io::Result<Box<dyn PipeStream>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("no control channel transport for {}", self.address),
        ))
    }
}
