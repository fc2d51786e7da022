use thiserror::Error;

/// Result type alias using `PlayerError`
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Everything that can go wrong while talking to or editing the player.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Document, category or sound absent
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Index beyond the known bounds
    #[error("Index {index} out of range (1..={count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// An expected section of the soundlist is missing
    #[error("Malformed soundlist: {0}")]
    MalformedDocument(String),

    /// The control channel did not answer in time
    #[error("Control channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// The player answered with a failure status
    #[error("Player rejected {command} (R-{code})")]
    Rejected { command: String, code: u16 },

    /// The player did not stop, or did not become ready, within its window
    #[error("Player process timeout: {0}")]
    ProcessTimeout(String),

    /// Tag probing of an audio file failed
    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl PlayerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelUnavailable(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::ProcessTimeout(msg.into())
    }
}
