//! The consumer-facing surface. Every operation returns a `CommandOutcome`;
//! errors are logged here and handed back as messages, never propagated.

use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::lifecycle::{Coordinator, RelaunchPolicy};
use crate::library::import_sound_file;
use crate::logging::{self, LogEntry};
use crate::metadata::{read_sound_tags, SoundTags};
use crate::models::{CategoryInfo, CommandOutcome, PlayerStatus, Sound};
use crate::process::{ProcessControl, SystemProcessControl};
use crate::remote::{PipeClient, PipeConnector, PlayerRequest, ReplyStatus, SystemPipeConnector};
use crate::spl::mutate::{self, AddedSound, NewSound};
use crate::spl::store::read_document;
use crate::spl::{enrich_live_list, Soundlist};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct AppState {
    pub config: PlayerConfig,
    pub client: Arc<PipeClient>,
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    pub fn new(
        config: PlayerConfig,
        process: Arc<dyn ProcessControl>,
        connector: Arc<dyn PipeConnector>,
    ) -> Self {
        let client = Arc::new(PipeClient::new(connector, &config.timings));
        let coordinator = Arc::new(Coordinator::new(process, Arc::clone(&client), &config));
        Self {
            config,
            client,
            coordinator,
        }
    }

    pub fn from_config(config: PlayerConfig) -> Self {
        let process = Arc::new(SystemProcessControl::from_config(&config));
        let connector = Arc::new(SystemPipeConnector::new(config.pipe_address.clone()));
        Self::new(config, process, connector)
    }
}

fn report<T>(operation: &str, result: Result<T>) -> CommandOutcome<T> {
    if let Err(e) = &result {
        log::error!("{} failed: {}", operation, e);
    }
    result.into()
}

fn report_done(operation: &str, result: Result<()>) -> CommandOutcome<()> {
    match result {
        Ok(()) => {
            log::info!("{} done", operation);
            CommandOutcome::done()
        }
        Err(e) => {
            log::error!("{} failed: {}", operation, e);
            CommandOutcome::error(e.to_string())
        }
    }
}

/// Send a request and return its payload. `R-200` has an empty payload;
/// any other `R-nnn` is an error.
async fn request(state: &AppState, req: PlayerRequest) -> Result<String> {
    match state.client.request(&req).await? {
        ReplyStatus::Ok => Ok(String::new()),
        ReplyStatus::Payload(text) => Ok(text),
        ReplyStatus::Failed(code) => Err(PlayerError::Rejected {
            command: req.to_string(),
            code,
        }),
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub async fn get_status(state: &AppState) -> CommandOutcome<PlayerStatus> {
    let running = state.coordinator.is_running().await.unwrap_or_else(|e| {
        log::warn!("Process query failed: {}", e);
        false
    });
    let connected = state.client.is_connected().await;
    CommandOutcome::ok(PlayerStatus {
        running,
        connected,
        lifecycle: state.coordinator.state(),
    })
}

/// Live list from the player, enriched with categories from the soundlist.
pub async fn list_sounds(state: &AppState) -> CommandOutcome<Vec<Sound>> {
    report("List sounds", fetch_sounds(state).await)
}

async fn fetch_sounds(state: &AppState) -> Result<Vec<Sound>> {
    let live = request(state, PlayerRequest::GetSoundlist).await?;

    // 1. Hierarchy is optional: a missing or unreadable file only costs categories
    let document = match read_document(&state.config.document_path) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Listing sounds without hierarchy: {}", e);
            None
        }
    };

    // 2. Overlay
    let sounds = enrich_live_list(&live, document.as_deref());
    log::debug!("Listed {} sounds", sounds.len());
    Ok(sounds)
}

pub async fn list_categories(state: &AppState) -> CommandOutcome<Vec<CategoryInfo>> {
    let result = read_document(&state.config.document_path)
        .map(|text| Soundlist::parse(&text).category_infos());
    report("List categories", result)
}

pub async fn play_status(state: &AppState) -> CommandOutcome<String> {
    report(
        "Play status",
        request(state, PlayerRequest::GetPlayStatus).await,
    )
}

pub async fn get_volume(state: &AppState) -> CommandOutcome<u32> {
    let result = request(state, PlayerRequest::GetVolume)
        .await
        .and_then(|text| {
            text.trim()
                .parse::<u32>()
                .map_err(|_| PlayerError::channel(format!("unexpected volume reply {:?}", text)))
        });
    report("Get volume", result)
}

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// Play by player index. Routing flags are only sent when both are given.
pub async fn play_sound(
    state: &AppState,
    player_index: usize,
    speakers: Option<bool>,
    mic: Option<bool>,
) -> CommandOutcome<()> {
    let req = match (speakers, mic) {
        (Some(speakers), Some(mic)) => PlayerRequest::PlaySoundRouted {
            index: player_index,
            speakers,
            mic,
        },
        _ => PlayerRequest::PlaySound(player_index),
    };
    report_done(&format!("Play sound {}", player_index), request(state, req).await.map(|_| ()))
}

pub async fn stop_sound(state: &AppState) -> CommandOutcome<()> {
    report_done("Stop sound", request(state, PlayerRequest::StopSound).await.map(|_| ()))
}

pub async fn toggle_pause(state: &AppState) -> CommandOutcome<()> {
    report_done("Toggle pause", request(state, PlayerRequest::TogglePause).await.map(|_| ()))
}

pub async fn play_previous(state: &AppState) -> CommandOutcome<()> {
    report_done(
        "Play previous",
        request(state, PlayerRequest::PlayPreviousSound).await.map(|_| ()),
    )
}

// ---------------------------------------------------------------------------
// Soundlist edits (stop → edit → relaunch)
// ---------------------------------------------------------------------------

/// With `restart` the player is always brought back up afterwards; without
/// it, only if it was running to begin with.
pub async fn rename_sound(
    state: &AppState,
    player_index: usize,
    title: String,
    restart: bool,
) -> CommandOutcome<()> {
    let policy = if restart {
        RelaunchPolicy::Always
    } else {
        RelaunchPolicy::IfWasRunning
    };
    let result = state
        .coordinator
        .with_player_stopped(policy, |text| {
            Ok((mutate::rename_sound(text, player_index, &title)?, ()))
        })
        .await;
    report_done(&format!("Rename sound {} to {:?}", player_index, title), result)
}

/// Import `source` into the sounds directory and add it to the soundlist,
/// optionally referenced from `category`.
pub async fn add_sound(
    state: &AppState,
    source: PathBuf,
    category: Option<String>,
) -> CommandOutcome<Sound> {
    report(
        &format!("Add sound {:?}", source),
        add_sound_inner(state, source, category).await,
    )
}

async fn add_sound_inner(
    state: &AppState,
    source: PathBuf,
    category: Option<String>,
) -> Result<Sound> {
    // 1. Permanent copy
    let imported = import_sound_file(&source, &state.config.sounds_dir)?;
    let destination = imported.path.clone();

    // 2. Tags
    let tags = read_sound_tags(&destination).unwrap_or_else(|e| {
        log::warn!("No tags for {:?}: {}", destination, e);
        SoundTags::default()
    });
    let title = tags.title.or_else(|| {
        destination
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
    });
    let new_sound = NewSound {
        url: destination.to_string_lossy().to_string(),
        title,
        artist: tags.artist,
        duration: tags.duration,
        added_on: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
    };

    // 3. Soundlist
    let added = state
        .coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            let AddedSound { document, spl_id } =
                mutate::add_sound(text, &new_sound, category.as_deref())?;
            Ok((document, spl_id))
        })
        .await;

    // 4. A copy the soundlist never took in is orphaned
    let spl_id = match added {
        Ok(spl_id) => spl_id,
        Err(e) => {
            if !defines_url(&state.config.document_path, &new_sound.url) {
                imported.discard();
            }
            return Err(e);
        }
    };

    Ok(Sound {
        player_index: spl_id + 1,
        spl_id: Some(spl_id),
        title: new_sound.title.clone().unwrap_or_default(),
        url: new_sound.url.clone(),
        artist: new_sound.artist.clone(),
        duration: new_sound.duration.clone(),
        added_on: new_sound.added_on.clone(),
        category_path: category.iter().cloned().collect(),
        category,
        ..Default::default()
    })
}

/// Whether the soundlist on disk has a definition for `url`.
fn defines_url(document_path: &Path, url: &str) -> bool {
    read_document(document_path)
        .map(|text| {
            Soundlist::parse(&text)
                .definitions
                .iter()
                .any(|d| d.attrs.get("url") == Some(url))
        })
        .unwrap_or(false)
}

pub async fn move_sound(
    state: &AppState,
    player_index: usize,
    category: String,
    position: usize,
) -> CommandOutcome<()> {
    let result = state
        .coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((
                mutate::move_sound(text, player_index, &category, position)?,
                (),
            ))
        })
        .await;
    report_done(
        &format!("Move sound {} to {:?}[{}]", player_index, category, position),
        result,
    )
}

pub async fn move_category(state: &AppState, name: String, position: usize) -> CommandOutcome<()> {
    let result = state
        .coordinator
        .with_player_stopped(RelaunchPolicy::Always, |text| {
            Ok((mutate::move_category(text, &name, position)?, ()))
        })
        .await;
    report_done(&format!("Move category {:?} to {}", name, position), result)
}

pub async fn start_player(state: &AppState) -> CommandOutcome<()> {
    report_done("Start player", state.coordinator.start().await)
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

pub fn get_logs(limit: usize) -> Vec<LogEntry> {
    logging::state()
        .map(|state| state.recent(limit))
        .unwrap_or_default()
}

pub fn set_debug_mode(enabled: bool) {
    if let Some(state) = logging::state() {
        state.set_debug(enabled);
    }
}
