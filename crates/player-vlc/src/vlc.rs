use crate::parser::{parse_playlist, parse_status};
use async_trait::async_trait;
use scribectl_core::{
    Action, ActionError, ActionKind, ConnectError, Credentials, Device, FetchError, HttpTransport,
    PlaybackState, PlayerBackend, PlayerConfig, PlayerKind, Playlist, Request, Status, Track, Transport,
};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const STATUS_PATH: &str = "/requests/status.xml";
pub const PLAYLIST_PATH: &str = "/requests/playlist.xml";

/// VLC volume scale: 256 is 100%, the interface allows up to 125%
pub const VLC_MAX_VOLUME: u32 = 320;
pub const VLC_DEFAULT_VOLUME: u32 = 256;

const SUPPORTED_ACTIONS: &[ActionKind] = &ActionKind::ALL;

const CUSTOM_ACTIONS: &[&str] = &["stop", "jump", "rate", "toggleLoop", "toggleFullscreen"];

/// VLC controller using the Lua HTTP interface
///
/// API format: {scheme}://{host}:{port}/requests/status.xml?command={command}&val={value}
/// Every command answers with a full status document, which is ignored; the
/// session re-fetches status after each command.
pub struct VlcBackend {
    transport: Arc<dyn Transport>,
    /// Volume to restore when unmuting
    muted_volume: Mutex<Option<u32>>,
    /// Audio stream last selected through this backend
    selected_output: Mutex<Option<String>>,
}

fn command(name: &str) -> Request {
    Request::get(STATUS_PATH).query("command", name)
}

/// Build the request for `action`
///
/// `muted_volume` is the level remembered by a previous mute. Volumes are
/// clamped to `VLC_MAX_VOLUME`, the top of `volume_range`.
pub fn command_for(
    action: &Action,
    current: Option<&Status>,
    muted_volume: Option<u32>,
) -> Result<Request, ActionError> {
    let state = current.map(|s| s.state).unwrap_or_default();

    let request = match action {
        Action::Play => match state {
            PlaybackState::Stopped => command("pl_play"),
            _ => command("pl_forceresume"),
        },
        Action::Pause => command("pl_forcepause"),
        Action::TogglePlay => match state {
            PlaybackState::Stopped => command("pl_play"),
            _ => command("pl_pause"),
        },
        Action::Next => command("pl_next"),
        Action::Previous => command("pl_previous"),
        Action::Seek(seconds) => command("seek").query("val", seconds),
        Action::SetVolume(level) => command("volume").query("val", (*level).min(VLC_MAX_VOLUME)),
        Action::ToggleMute => {
            let volume = current.map(|s| s.volume).unwrap_or(0);
            if volume > 0 {
                command("volume").query("val", 0)
            } else {
                command("volume").query("val", muted_volume.unwrap_or(VLC_DEFAULT_VOLUME))
            }
        }
        Action::ToggleShuffle => command("pl_random"),
        Action::ToggleRepeat => command("pl_repeat"),
        Action::SelectOutput(id) => command("audio_track").query("val", id),
        Action::SelectPlaylistItem(id) => command("pl_play").query("id", id),
        Action::Custom { name, arg } => custom_command(name, arg.as_deref())?,
    };

    Ok(request)
}

fn custom_command(name: &str, arg: Option<&str>) -> Result<Request, ActionError> {
    match name {
        "stop" => Ok(command("pl_stop")),
        "toggleLoop" => Ok(command("pl_loop")),
        "toggleFullscreen" => Ok(command("fullscreen")),
        "jump" => {
            let offset: i64 = arg
                .and_then(|a| a.trim().parse().ok())
                .ok_or_else(|| ActionError::InvalidArgument("jump needs a signed number of seconds".to_string()))?;
            Ok(command("seek").query("val", format!("{:+}", offset)))
        }
        "rate" => {
            let rate: f64 = arg
                .and_then(|a| a.trim().parse().ok())
                .filter(|r: &f64| r.is_finite() && *r > 0.0)
                .ok_or_else(|| ActionError::InvalidArgument("rate needs a positive number".to_string()))?;
            Ok(command("rate").query("val", rate))
        }
        other => Err(ActionError::Unsupported(other.to_string())),
    }
}

impl VlcBackend {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            muted_volume: Mutex::new(None),
            selected_output: Mutex::new(None),
        }
    }

    /// Create a backend talking HTTP to the configured host
    pub fn from_config(config: &PlayerConfig) -> Result<Self, ConnectError> {
        if config.kind != PlayerKind::Vlc {
            return Err(ConnectError::InvalidConfig(format!("'{}' is not a VLC player", config.name)));
        }
        if config.password.is_empty() {
            return Err(ConnectError::InvalidConfig(
                "VLC's HTTP interface requires a password".to_string(),
            ));
        }

        let base_url = format!("{}://{}:{}", config.scheme(), config.host, config.port);
        let transport = HttpTransport::new(
            base_url,
            Credentials::Basic {
                password: config.password.clone(),
            },
        )?;

        Ok(Self::new(Arc::new(transport)))
    }

    async fn mark_active_output(&self, status: &mut Status) {
        let selected = self.selected_output.lock().await.clone();
        let active_idx = match selected {
            Some(id) => status.devices.iter().position(|d| d.id == id),
            None => None,
        }
        .or(if status.devices.is_empty() { None } else { Some(0) });

        for (idx, device) in status.devices.iter_mut().enumerate() {
            device.is_active = Some(idx) == active_idx;
        }
    }
}

#[async_trait]
impl PlayerBackend for VlcBackend {
    fn kind(&self) -> PlayerKind {
        PlayerKind::Vlc
    }

    fn supported_actions(&self) -> &'static [ActionKind] {
        SUPPORTED_ACTIONS
    }

    fn custom_actions(&self) -> &'static [&'static str] {
        CUSTOM_ACTIONS
    }

    fn volume_range(&self) -> RangeInclusive<u32> {
        0..=VLC_MAX_VOLUME
    }

    /// Request: GET /requests/status.xml
    async fn fetch_status(&self) -> Result<Status, FetchError> {
        let body = self.transport.send(&Request::get(STATUS_PATH)).await?;
        let mut status = parse_status(&body)?;
        self.mark_active_output(&mut status).await;
        Ok(status)
    }

    async fn execute(&self, action: &Action, current: Option<&Status>) -> Result<(), ActionError> {
        let muted_volume = *self.muted_volume.lock().await;
        let request = command_for(action, current, muted_volume)?;

        tracing::debug!("VLC command '{}': {:?}", action.name(), request.query);
        self.transport.send(&request).await?;

        match action {
            Action::ToggleMute => {
                let volume = current.map(|s| s.volume).unwrap_or(0);
                *self.muted_volume.lock().await = (volume > 0).then_some(volume);
            }
            Action::SelectOutput(id) => {
                *self.selected_output.lock().await = Some(id.clone());
            }
            _ => {}
        }

        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, ActionError> {
        Ok(self.fetch_status().await?.devices)
    }

    /// Request: GET /requests/playlist.xml
    async fn playlists(&self) -> Result<Vec<Playlist>, ActionError> {
        let body = self.transport.send(&Request::get(PLAYLIST_PATH)).await?;
        let playlists = parse_playlist(&body)?;
        tracing::debug!("VLC reported {} playlist(s)", playlists.len());
        Ok(playlists)
    }

    async fn tracks(&self, playlist: &Playlist) -> Result<Vec<Track>, ActionError> {
        self.playlists()
            .await?
            .into_iter()
            .find(|p| p.id == playlist.id)
            .map(|p| p.tracks)
            .ok_or_else(|| ActionError::InvalidArgument(format!("playlist '{}' no longer exists", playlist.name)))
    }
}
