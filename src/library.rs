//! Copying sound files into the permanent sounds directory.

use crate::error::{PlayerError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A sound file in the sounds directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub path: PathBuf,
    /// Made by this import rather than found in place
    pub copied: bool,
}

impl ImportedFile {
    /// Undo the import. Files that were already there are left alone.
    pub fn discard(&self) {
        if !self.copied {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => log::info!("Removed unused copy {:?}", self.path),
            Err(e) => log::warn!("Could not remove {:?}: {}", self.path, e),
        }
    }
}

/// Copy `source` into `sounds_dir` and return where it landed. Files already
/// inside `sounds_dir` are used in place; name clashes get a ` (n)` suffix.
pub fn import_sound_file(source: &Path, sounds_dir: &Path) -> Result<ImportedFile> {
    if !source.is_file() {
        return Err(PlayerError::not_found(
            "Sound file",
            source.display().to_string(),
        ));
    }
    fs::create_dir_all(sounds_dir)?;

    let source = source.canonicalize()?;
    let home = sounds_dir.canonicalize()?;
    if source.starts_with(&home) {
        log::debug!("{:?} already in the sounds directory", source);
        return Ok(ImportedFile {
            path: source,
            copied: false,
        });
    }

    let destination = unique_destination(&home, &source)?;
    fs::copy(&source, &destination)?;
    log::info!("Imported {:?} -> {:?}", source, destination);
    Ok(ImportedFile {
        path: destination,
        copied: true,
    })
}

fn unique_destination(dir: &Path, source: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| PlayerError::not_found("Sound file", source.display().to_string()))?;
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = dir.join(format!("{} ({}){}", stem, n, extension));
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}
