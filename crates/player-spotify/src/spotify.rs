use crate::parser::*;
use async_trait::async_trait;
use scribectl_core::{
    Action, ActionError, ActionKind, ConnectError, Credentials, Device, FetchError, HttpTransport,
    PlayerBackend, PlayerConfig, PlayerKind, Playlist, Request, Status, Track, Transport,
};
use serde_json::json;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

const PLAYER_PATH: &str = "/me/player";

pub const SPOTIFY_MAX_VOLUME: u32 = 100;

/// Spotify has no mute endpoint and no custom actions
const SUPPORTED_ACTIONS: &[ActionKind] = &[
    ActionKind::Play,
    ActionKind::Pause,
    ActionKind::TogglePlay,
    ActionKind::Next,
    ActionKind::Previous,
    ActionKind::Seek,
    ActionKind::SetVolume,
    ActionKind::ToggleShuffle,
    ActionKind::ToggleRepeat,
    ActionKind::SelectOutput,
    ActionKind::SelectPlaylistItem,
];

/// Spotify Web API controller
///
/// Authenticates with a bearer token obtained elsewhere. Track ids are
/// Spotify URIs.
pub struct SpotifyBackend {
    transport: Arc<dyn Transport>,
}

/// Build the request for `action`; toggles derive their target from `current`
///
/// Volumes are clamped to `SPOTIFY_MAX_VOLUME`, the top of `volume_range`.
pub fn command_for(action: &Action, current: Option<&Status>) -> Result<Request, ActionError> {
    let current = current.cloned().unwrap_or_default();

    let request = match action {
        Action::Play => Request::put("/me/player/play"),
        Action::Pause => Request::put("/me/player/pause"),
        Action::TogglePlay if current.is_playing() => Request::put("/me/player/pause"),
        Action::TogglePlay => Request::put("/me/player/play"),
        Action::Next => Request::post("/me/player/next"),
        Action::Previous => Request::post("/me/player/previous"),
        Action::Seek(seconds) => {
            Request::put("/me/player/seek").query("position_ms", seconds.saturating_mul(1000))
        }
        Action::SetVolume(level) => {
            Request::put("/me/player/volume").query("volume_percent", (*level).min(SPOTIFY_MAX_VOLUME))
        }
        Action::ToggleShuffle => Request::put("/me/player/shuffle").query("state", !current.random),
        Action::ToggleRepeat => {
            let next = if current.repeat || current.loop_all { "off" } else { "context" };
            Request::put("/me/player/repeat").query("state", next)
        }
        Action::SelectOutput(id) => Request::put(PLAYER_PATH).json(json!({ "device_ids": [id] })),
        Action::SelectPlaylistItem(uri) => Request::put("/me/player/play").json(json!({ "uris": [uri] })),
        Action::ToggleMute | Action::Custom { .. } => return Err(ActionError::Unsupported(action.name())),
    };

    Ok(request)
}

impl SpotifyBackend {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_config(config: &PlayerConfig) -> Result<Self, ConnectError> {
        if config.kind != PlayerKind::Spotify {
            return Err(ConnectError::InvalidConfig(format!("'{}' is not a Spotify player", config.name)));
        }
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConnectError::InvalidConfig("Spotify players need an access token".to_string()))?;

        let transport = HttpTransport::new(SPOTIFY_API_BASE, Credentials::Bearer(token))?;
        Ok(Self::new(Arc::new(transport)))
    }
}

#[async_trait]
impl PlayerBackend for SpotifyBackend {
    fn kind(&self) -> PlayerKind {
        PlayerKind::Spotify
    }

    fn supported_actions(&self) -> &'static [ActionKind] {
        SUPPORTED_ACTIONS
    }

    fn volume_range(&self) -> RangeInclusive<u32> {
        0..=SPOTIFY_MAX_VOLUME
    }

    async fn fetch_status(&self) -> Result<Status, FetchError> {
        let body = self.transport.send(&Request::get(PLAYER_PATH)).await?;
        Ok(parse_player_state(&body)?)
    }

    async fn execute(&self, action: &Action, current: Option<&Status>) -> Result<(), ActionError> {
        let request = command_for(action, current)?;
        tracing::debug!("Spotify command '{}': {} {}", action.name(), request.method.as_str(), request.path);
        self.transport.send(&request).await?;
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, ActionError> {
        let body = self.transport.send(&Request::get("/me/player/devices")).await?;
        Ok(parse_devices(&body)?)
    }

    async fn playlists(&self) -> Result<Vec<Playlist>, ActionError> {
        let body = self
            .transport
            .send(&Request::get("/me/playlists").query("limit", 50))
            .await?;
        Ok(parse_playlists(&body)?)
    }

    async fn tracks(&self, playlist: &Playlist) -> Result<Vec<Track>, ActionError> {
        let request = Request::get(format!("/playlists/{}/tracks", playlist.id)).query("limit", 100);
        let body = self.transport.send(&request).await?;
        let tracks = parse_playlist_tracks(&body)?;
        tracing::debug!("Spotify playlist '{}' has {} track(s)", playlist.name, tracks.len());
        Ok(tracks)
    }
}
