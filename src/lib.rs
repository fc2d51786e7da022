pub mod commands;
pub mod config;
pub mod error;
pub mod library;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod process;
pub mod remote;
pub mod spl;

use commands::AppState;
use config::PlayerConfig;
use std::path::Path;

pub use error::{PlayerError, Result};

/// Load the config, install the logger and build the shared state the
/// command surface runs against.
pub fn init<P: AsRef<Path>>(config_path: P) -> Result<AppState> {
    let config = PlayerConfig::load(config_path)?;
    logging::init(&config.log_dir, config.debug_logging);
    log::info!(
        "RagePad {} using soundlist {:?}, pipe {}",
        env!("CARGO_PKG_VERSION"),
        config.document_path,
        config.pipe_address
    );
    Ok(AppState::from_config(config))
}
