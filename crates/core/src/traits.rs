use crate::errors::{ActionError, FetchError};
use crate::models::{Device, PlayerKind, Playlist, Status, Track};
use async_trait::async_trait;
use std::fmt;
use std::ops::RangeInclusive;

/// A high-level command a session can send to its player
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Play,
    Pause,
    TogglePlay,
    Next,
    Previous,
    /// Absolute position in seconds
    Seek(u64),
    /// Level on the backend's own scale, clamped by the session
    SetVolume(u32),
    ToggleMute,
    ToggleShuffle,
    ToggleRepeat,
    SelectOutput(String),
    SelectPlaylistItem(String),
    /// Backend-specific action listed by `PlayerBackend::custom_actions`
    Custom { name: String, arg: Option<String> },
}

/// Capability tag for an `Action`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Play,
    Pause,
    TogglePlay,
    Next,
    Previous,
    Seek,
    SetVolume,
    ToggleMute,
    ToggleShuffle,
    ToggleRepeat,
    SelectOutput,
    SelectPlaylistItem,
    Custom,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::Play,
        ActionKind::Pause,
        ActionKind::TogglePlay,
        ActionKind::Next,
        ActionKind::Previous,
        ActionKind::Seek,
        ActionKind::SetVolume,
        ActionKind::ToggleMute,
        ActionKind::ToggleShuffle,
        ActionKind::ToggleRepeat,
        ActionKind::SelectOutput,
        ActionKind::SelectPlaylistItem,
        ActionKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Play => "play",
            ActionKind::Pause => "pause",
            ActionKind::TogglePlay => "togglePlay",
            ActionKind::Next => "next",
            ActionKind::Previous => "previous",
            ActionKind::Seek => "seek",
            ActionKind::SetVolume => "setVolume",
            ActionKind::ToggleMute => "toggleMute",
            ActionKind::ToggleShuffle => "toggleShuffle",
            ActionKind::ToggleRepeat => "toggleRepeat",
            ActionKind::SelectOutput => "selectOutput",
            ActionKind::SelectPlaylistItem => "selectPlaylistItem",
            ActionKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Play => ActionKind::Play,
            Action::Pause => ActionKind::Pause,
            Action::TogglePlay => ActionKind::TogglePlay,
            Action::Next => ActionKind::Next,
            Action::Previous => ActionKind::Previous,
            Action::Seek(_) => ActionKind::Seek,
            Action::SetVolume(_) => ActionKind::SetVolume,
            Action::ToggleMute => ActionKind::ToggleMute,
            Action::ToggleShuffle => ActionKind::ToggleShuffle,
            Action::ToggleRepeat => ActionKind::ToggleRepeat,
            Action::SelectOutput(_) => ActionKind::SelectOutput,
            Action::SelectPlaylistItem(_) => ActionKind::SelectPlaylistItem,
            Action::Custom { .. } => ActionKind::Custom,
        }
    }

    /// Name used in logs and `Unsupported` errors
    pub fn name(&self) -> String {
        match self {
            Action::Custom { name, .. } => name.clone(),
            other => other.kind().to_string(),
        }
    }
}

/// Player-specific half of a session (VLC, Spotify, ...)
///
/// A backend knows how to talk to one player over its transport. It holds no
/// session state: connection lifecycle, polling and events live in the
/// session that owns it.
#[async_trait]
pub trait PlayerBackend: Send + Sync {
    fn kind(&self) -> PlayerKind;

    /// Actions this backend can perform
    fn supported_actions(&self) -> &'static [ActionKind];

    /// Names accepted by `Action::Custom`
    fn custom_actions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Valid range for `Action::SetVolume`
    fn volume_range(&self) -> RangeInclusive<u32>;

    fn supports(&self, kind: ActionKind) -> bool {
        self.supported_actions().contains(&kind)
    }

    /// One status round trip
    async fn fetch_status(&self) -> Result<Status, FetchError>;

    /// Issue the command for `action`. `current` is the latest known status.
    async fn execute(&self, action: &Action, current: Option<&Status>) -> Result<(), ActionError>;

    async fn devices(&self) -> Result<Vec<Device>, ActionError>;

    async fn playlists(&self) -> Result<Vec<Playlist>, ActionError>;

    async fn tracks(&self, playlist: &Playlist) -> Result<Vec<Track>, ActionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Seek(10).name(), "seek");
        assert_eq!(Action::SelectOutput("1".into()).kind(), ActionKind::SelectOutput);
        let custom = Action::Custom { name: "jump".into(), arg: Some("-5".into()) };
        assert_eq!(custom.name(), "jump");
        assert_eq!(custom.kind(), ActionKind::Custom);
    }
}
