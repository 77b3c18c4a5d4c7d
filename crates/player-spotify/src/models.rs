use serde::{Deserialize, Serialize};

/// Response from GET /me/player
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackStateResponse {
    #[serde(default)]
    pub device: Option<DeviceObject>,
    #[serde(default)]
    pub shuffle_state: bool,
    /// "off", "track" or "context"
    #[serde(default = "default_repeat")]
    pub repeat_state: String,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub item: Option<TrackObject>,
}

fn default_repeat() -> String {
    "off".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

/// Response from GET /me/player/devices
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtistObject {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
}

/// Response from GET /me/playlists
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistsPage {
    #[serde(default)]
    pub items: Vec<PlaylistObject>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistItem {
    /// Null for removed or local-only items
    #[serde(default)]
    pub track: Option<TrackObject>,
}

/// Response from GET /playlists/{id}/tracks
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}
