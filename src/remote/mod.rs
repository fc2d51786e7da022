//! The player's remote-control channel.

pub mod client;
pub mod framing;
pub mod request;
pub mod transport;

pub use client::{ConnectionState, PipeClient};
pub use request::{PlayerRequest, ReplyStatus};
pub use transport::{PipeConnector, PipeStream, SystemPipeConnector};
