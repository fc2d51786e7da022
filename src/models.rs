use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sound {
    pub player_index: usize, // 1-based, from the live control channel
    pub spl_id: Option<usize>, // 0-based position among soundlist definitions
    pub title: String,
    pub url: String,
    pub artist: Option<String>,
    pub duration: Option<String>,
    pub added_on: Option<String>,
    pub last_played_on: Option<String>,
    pub play_count: u64,
    pub category: Option<String>,
    pub parent_category: Option<String>,
    pub category_path: Vec<String>,
    pub category_index: Option<usize>,
    pub category_image: Option<CategoryIcon>,
}

/// A category icon is either one of the player's symbolic names or an
/// inline base64 image.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CategoryIcon {
    Named(String),
    Image(String),
}

/// Symbolic names are short and stick to `[A-Za-z0-9_-]`.
const MAX_ICON_NAME_LEN: usize = 64;

impl CategoryIcon {
    pub fn classify(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let symbolic = raw.len() <= MAX_ICON_NAME_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if symbolic {
            Some(Self::Named(raw.to_string()))
        } else {
            Some(Self::Image(raw.to_string()))
        }
    }
}

/// Placement of one sound inside the on-disk category tree.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyEntry {
    pub category: String,
    pub parent_category: Option<String>,
    pub category_index: usize,
    pub category_path: Vec<String>,
}

/// A visible category as listed to the consumer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub name: String,
    pub icon: Option<CategoryIcon>,
    pub sound_ids: Vec<usize>, // splIds of direct references, in order
    pub children: Vec<CategoryInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub running: bool,
    pub connected: bool,
    pub lifecycle: crate::lifecycle::LifecycleState,
}

/// Outcome handed across the consumer boundary. Never an `Err`.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CommandOutcome<T> {
    Ok { data: Option<T> },
    Error { message: String },
}

impl<T> CommandOutcome<T> {
    pub fn ok(data: T) -> Self {
        CommandOutcome::Ok { data: Some(data) }
    }

    pub fn done() -> Self {
        CommandOutcome::Ok { data: None }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        CommandOutcome::Error {
            message: msg.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CommandOutcome::Ok { .. })
    }
}

impl<T> From<crate::error::Result<T>> for CommandOutcome<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(data) => CommandOutcome::ok(data),
            Err(e) => CommandOutcome::error(e.to_string()),
        }
    }
}
