use serde::Serialize;
use std::fmt;

/// Commands understood by the player's control channel, written as
/// `Verb(arg1,arg2,...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerRequest {
    GetSoundlist,
    GetCategories { with_sounds: bool, with_icons: bool },
    PlaySound(usize),
    PlaySoundRouted { index: usize, speakers: bool, mic: bool },
    StopSound,
    TogglePause,
    PlayPreviousSound,
    GetPlayStatus,
    GetVolume,
}

impl fmt::Display for PlayerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerRequest::GetSoundlist => write!(f, "GetSoundlist()"),
            PlayerRequest::GetCategories {
                with_sounds,
                with_icons,
            } => write!(f, "GetCategories({},{})", with_sounds, with_icons),
            PlayerRequest::PlaySound(index) => write!(f, "DoPlaySound({})", index),
            PlayerRequest::PlaySoundRouted {
                index,
                speakers,
                mic,
            } => write!(f, "DoPlaySound({},{},{})", index, speakers, mic),
            PlayerRequest::StopSound => write!(f, "DoStopSound()"),
            PlayerRequest::TogglePause => write!(f, "DoTogglePause()"),
            PlayerRequest::PlayPreviousSound => write!(f, "DoPlayPreviousSound()"),
            PlayerRequest::GetPlayStatus => write!(f, "GetPlayStatus()"),
            PlayerRequest::GetVolume => write!(f, "GetVolume()"),
        }
    }
}

/// A reply split into its status, when it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ReplyStatus {
    /// `R-200`
    Ok,
    /// Any other `R-nnn`
    Failed(u16),
    /// Everything else is data
    Payload(String),
}

impl ReplyStatus {
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim();
        let code = reply
            .strip_prefix("R-")
            .filter(|rest| rest.len() >= 3 && rest.as_bytes()[..3].iter().all(u8::is_ascii_digit))
            .and_then(|rest| rest[..3].parse::<u16>().ok());
        match code {
            Some(200) => ReplyStatus::Ok,
            Some(code) => ReplyStatus::Failed(code),
            None => ReplyStatus::Payload(reply.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, ReplyStatus::Failed(_))
    }
}
