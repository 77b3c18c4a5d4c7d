use crate::models::*;
use scribectl_core::{Device, ParseError, PlaybackState, Playlist, Status, Track};
use serde::de::DeserializeOwned;

fn from_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ParseError> {
    serde_json::from_slice(body).map_err(|e| ParseError::MalformedJson(e.to_string()))
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(|b| b.is_ascii_whitespace())
}

fn to_track(track: TrackObject) -> Option<Track> {
    if track.uri.is_empty() {
        return None;
    }

    let artist = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    Some(Track {
        // Playback is addressed by URI, so the URI doubles as the id
        id: track.uri.clone(),
        name: track.name,
        artist: (!artist.is_empty()).then_some(artist),
        duration: track.duration_ms / 1000,
        uri: Some(track.uri),
    })
}

fn to_device(device: DeviceObject) -> Option<Device> {
    Some(Device {
        id: device.id?,
        name: device.name,
        is_active: device.is_active,
    })
}

/// Parse GET /me/player
///
/// Spotify answers 204 with no body when nothing is active; that is an idle
/// status, not an error.
pub fn parse_player_state(body: &[u8]) -> Result<Status, ParseError> {
    if is_blank(body) {
        return Ok(Status::default());
    }

    let response: PlaybackStateResponse = from_json(body)?;

    let volume = response
        .device
        .as_ref()
        .and_then(|d| d.volume_percent)
        .unwrap_or(0)
        .min(100);
    let has_device = response.device.is_some();

    let state = if response.is_playing {
        PlaybackState::Playing
    } else if response.item.is_some() {
        PlaybackState::Paused
    } else {
        PlaybackState::Stopped
    };

    let current_track = response.item.and_then(to_track);
    let length = current_track.as_ref().map(|t| t.duration).unwrap_or(0);
    let progress_ms = response.progress_ms.unwrap_or(0);
    let position = if length > 0 {
        (progress_ms as f64 / (length as f64 * 1000.0)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(Status {
        state,
        volume,
        is_muted: has_device && volume == 0,
        repeat: response.repeat_state == "track",
        loop_all: response.repeat_state == "context",
        random: response.shuffle_state,
        current_track,
        time: progress_ms / 1000,
        length,
        position,
        devices: response.device.into_iter().filter_map(to_device).collect(),
    })
}

/// Parse GET /me/player/devices; devices without an id cannot be targeted and are skipped
pub fn parse_devices(body: &[u8]) -> Result<Vec<Device>, ParseError> {
    let response: DevicesResponse = from_json(body)?;
    Ok(response.devices.into_iter().filter_map(to_device).collect())
}

/// Parse GET /me/playlists
pub fn parse_playlists(body: &[u8]) -> Result<Vec<Playlist>, ParseError> {
    let page: PlaylistsPage = from_json(body)?;
    Ok(page
        .items
        .into_iter()
        .map(|p| Playlist {
            id: p.id,
            name: p.name,
            tracks: Vec::new(),
        })
        .collect())
}

/// Parse GET /playlists/{id}/tracks
pub fn parse_playlist_tracks(body: &[u8]) -> Result<Vec<Track>, ParseError> {
    let page: PlaylistTracksPage = from_json(body)?;
    Ok(page
        .items
        .into_iter()
        .filter_map(|item| item.track)
        .filter_map(to_track)
        .collect())
}
