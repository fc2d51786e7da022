//! Fresh reads and whole-file writes of the soundlist. Nothing is cached:
//! the player owns the file whenever it runs.

use crate::error::{PlayerError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn read_document(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PlayerError::not_found(
            "Soundlist",
            path.display().to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the full document next to the original, then rename it into place.
pub fn write_document(path: &Path, text: &str) -> Result<()> {
    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    log::debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}
