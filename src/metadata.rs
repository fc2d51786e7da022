use crate::error::{PlayerError, Result};
use lofty::prelude::*;
use lofty::read_from_path;
use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

/// What the player shows for a sound, read from the file's own tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoundTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// `m:ss`
    pub duration: Option<String>,
}

/// Reads title, artist and duration from an audio file
pub fn read_sound_tags<P: AsRef<Path>>(path: P) -> Result<SoundTags> {
    let path = path.as_ref();
    let tagged_file = read_from_path(path)
        .map_err(|e| PlayerError::Metadata(format!("{}: {}", path.display(), e)))?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let duration = tagged_file.properties().duration();
    Ok(SoundTags {
        title: tag.and_then(|t| t.title()).and_then(non_empty),
        artist: tag.and_then(|t| t.artist()).and_then(non_empty),
        duration: (!duration.is_zero()).then(|| format_duration(duration)),
    })
}

fn non_empty(value: Cow<'_, str>) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
