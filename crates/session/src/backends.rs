use scribectl_core::{ConnectError, PlayerBackend, PlayerConfig, PlayerKind};
use scribectl_player_spotify::SpotifyBackend;
use scribectl_player_vlc::VlcBackend;
use std::sync::Arc;

/// Build the backend matching the config's player type
pub fn create_backend(config: &PlayerConfig) -> Result<Arc<dyn PlayerBackend>, ConnectError> {
    tracing::debug!("Creating {} backend for '{}'", config.kind, config.name);
    match config.kind {
        PlayerKind::Vlc => Ok(Arc::new(VlcBackend::from_config(config)?)),
        PlayerKind::Spotify => Ok(Arc::new(SpotifyBackend::from_config(config)?)),
    }
}
