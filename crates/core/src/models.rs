use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-local identity assigned to a player config when it is loaded
pub type ConfigId = u64;

/// Which backend a configured player talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Vlc,
    Spotify,
}

impl PlayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerKind::Vlc => "vlc",
            PlayerKind::Spotify => "spotify",
        }
    }
}

impl fmt::Display for PlayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for invalid player kind strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsePlayerKindError;

impl fmt::Display for ParsePlayerKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid player type")
    }
}

impl std::error::Error for ParsePlayerKindError {}

impl FromStr for PlayerKind {
    type Err = ParsePlayerKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vlc" => Ok(PlayerKind::Vlc),
            "spotify" => Ok(PlayerKind::Spotify),
            _ => Err(ParsePlayerKindError),
        }
    }
}

/// Configuration for one player instance, as read from the settings source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    #[serde(rename = "type")]
    pub kind: PlayerKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    /// Use https even when the port is not 443
    #[serde(default)]
    pub https: bool,
    /// Spotify Web API token (the OAuth dance happens elsewhere)
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub connect_on_startup: bool,
    #[serde(default)]
    pub default_output_id: Option<String>,
    #[serde(default)]
    pub default_output_name: Option<String>,
    /// Output selected by name right after connecting
    #[serde(default)]
    pub initial_output: Option<String>,
    /// Only used by the status bar; carried so configs round-trip
    #[serde(default)]
    pub button_priority_offset: i32,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

impl PlayerConfig {
    /// Minimal VLC config, mostly useful in tests and for the CLI defaults
    pub fn vlc(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: PlayerKind::Vlc,
            name: name.into(),
            description: String::new(),
            host: default_host(),
            port: default_port(),
            password: password.into(),
            https: false,
            access_token: None,
            connect_on_startup: false,
            default_output_id: None,
            default_output_name: None,
            initial_output: None,
            button_priority_offset: 0,
        }
    }

    /// Minimal Spotify config
    pub fn spotify(name: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            kind: PlayerKind::Spotify,
            access_token: Some(access_token.into()),
            port: 443,
            https: true,
            host: "api.spotify.com".to_string(),
            ..Self::vlc(name, "")
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.https || self.port == 443 {
            "https"
        } else {
            "http"
        }
    }

    /// Label shown in selection prompts
    pub fn label(&self) -> String {
        if self.description.is_empty() {
            format!("{} ({})", self.name, self.kind)
        } else {
            format!("{} ({}) - {}", self.name, self.kind, self.description)
        }
    }
}

/// A config together with the identity it was given at load time
#[derive(Clone, Debug, PartialEq)]
pub struct ConfiguredPlayer {
    pub id: ConfigId,
    pub config: PlayerConfig,
}

/// Playback state reported by the player
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    #[default]
    Stopped,
}

/// Snapshot of the player, replaced wholesale on every refresh
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub state: PlaybackState,
    /// Device scale: VLC uses 0-320 with 256 = 100%, Spotify 0-100
    pub volume: u32,
    pub is_muted: bool,
    pub repeat: bool,
    pub loop_all: bool,
    pub random: bool,
    pub current_track: Option<Track>,
    /// Seconds into the current item
    pub time: u64,
    /// Length of the current item in seconds
    pub length: u64,
    /// Fraction of the item played, 0.0 to 1.0
    pub position: f64,
    /// Outputs in payload order
    #[serde(default)]
    pub devices: Vec<Device>,
}

impl Status {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn active_device(&self) -> Option<&Device> {
        self.devices.iter().find(|d| d.is_active)
    }
}

/// A playable item
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist: Option<String>,
    /// Seconds, 0 when unknown
    pub duration: u64,
    #[serde(default)]
    pub uri: Option<String>,
}

impl Track {
    pub fn label(&self) -> String {
        match &self.artist {
            Some(artist) if !artist.is_empty() => format!("{} - {}", artist, self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// May be empty until fetched through the owning session
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// An audio output the player can route to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// Plain labeled record handed to selection prompts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub label: String,
    pub detail: Option<String>,
}

impl From<&ConfiguredPlayer> for Candidate {
    fn from(player: &ConfiguredPlayer) -> Self {
        Self {
            id: player.id.to_string(),
            label: player.config.label(),
            detail: Some(format!(
                "{}://{}:{}",
                player.config.scheme(),
                player.config.host,
                player.config.port
            )),
        }
    }
}

impl From<&Track> for Candidate {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            label: track.label(),
            detail: (track.duration > 0).then(|| crate::timestamp::seconds_to_timestamp(track.duration)),
        }
    }
}

impl From<&Playlist> for Candidate {
    fn from(playlist: &Playlist) -> Self {
        Self {
            id: playlist.id.clone(),
            label: playlist.name.clone(),
            detail: (!playlist.tracks.is_empty()).then(|| format!("{} tracks", playlist.tracks.len())),
        }
    }
}

impl From<&Device> for Candidate {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id.clone(),
            label: device.name.clone(),
            detail: device.is_active.then(|| "active".to_string()),
        }
    }
}
