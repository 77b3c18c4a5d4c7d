#![allow(dead_code)]

use async_trait::async_trait;
use scribectl_core::{
    Action, ActionError, ActionKind, ConnectError, Device, FetchError, PlaybackState, PlayerBackend, PlayerConfig, PlayerKind,
    Playlist, Status, Track, TransportError,
};
use scribectl_session::{BackendFactory, PlayerSession, SessionOptions};
use std::collections::{HashSet, VecDeque};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const ALL_ACTIONS: &[ActionKind] = &ActionKind::ALL;

#[derive(Default)]
struct FakeState {
    status: Status,
    queued: VecDeque<Result<Status, FetchError>>,
    fetch_error: Option<FetchError>,
    hold_next: bool,
    hold_next_execute: bool,
    fetch_count: usize,
    executed: Vec<Action>,
    playlists: Vec<Playlist>,
}

/// Scriptable in-memory player
pub struct FakeBackend {
    state: Mutex<FakeState>,
    supported: &'static [ActionKind],
    volume_range: RangeInclusive<u32>,
    /// Signalled when a held fetch has started
    pub entered: Notify,
    /// Lets a held fetch complete
    pub release: Notify,
    /// Signalled when a held command has started
    pub exec_entered: Notify,
    /// Lets a held command complete
    pub exec_release: Notify,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Self::with_actions(ALL_ACTIONS)
    }

    pub fn with_actions(supported: &'static [ActionKind]) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                status: idle_status(),
                ..Default::default()
            }),
            supported,
            volume_range: 0..=100,
            entered: Notify::new(),
            release: Notify::new(),
            exec_entered: Notify::new(),
            exec_release: Notify::new(),
        })
    }

    /// Status returned by every fetch from now on
    pub fn set_status(&self, status: Status) {
        self.state.lock().unwrap().status = status;
    }

    pub fn status(&self) -> Status {
        self.state.lock().unwrap().status.clone()
    }

    /// Result for the next fetch only
    pub fn push_result(&self, result: Result<Status, FetchError>) {
        self.state.lock().unwrap().queued.push_back(result);
    }

    /// Fail every fetch until cleared
    pub fn set_fetch_error(&self, error: Option<FetchError>) {
        self.state.lock().unwrap().fetch_error = error;
    }

    /// Block the next fetch until `release` is notified
    pub fn hold_next_fetch(&self) {
        self.state.lock().unwrap().hold_next = true;
    }

    /// Block the next command until `exec_release` is notified
    pub fn hold_next_execute(&self) {
        self.state.lock().unwrap().hold_next_execute = true;
    }

    pub fn set_playlists(&self, playlists: Vec<Playlist>) {
        self.state.lock().unwrap().playlists = playlists;
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetch_count
    }

    pub fn executed(&self) -> Vec<Action> {
        self.state.lock().unwrap().executed.clone()
    }
}

#[async_trait]
impl PlayerBackend for FakeBackend {
    fn kind(&self) -> PlayerKind {
        PlayerKind::Vlc
    }

    fn supported_actions(&self) -> &'static [ActionKind] {
        self.supported
    }

    fn custom_actions(&self) -> &'static [&'static str] {
        &["stop"]
    }

    fn volume_range(&self) -> RangeInclusive<u32> {
        self.volume_range.clone()
    }

    async fn fetch_status(&self) -> Result<Status, FetchError> {
        let hold = {
            let mut state = self.state.lock().unwrap();
            state.fetch_count += 1;
            std::mem::take(&mut state.hold_next)
        };

        if hold {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(result) = state.queued.pop_front() {
            return result;
        }
        if let Some(e) = &state.fetch_error {
            return Err(e.clone());
        }
        Ok(state.status.clone())
    }

    async fn execute(&self, action: &Action, _current: Option<&Status>) -> Result<(), ActionError> {
        let hold = std::mem::take(&mut self.state.lock().unwrap().hold_next_execute);
        if hold {
            self.exec_entered.notify_one();
            self.exec_release.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        state.executed.push(action.clone());

        match action {
            Action::Play => state.status.state = PlaybackState::Playing,
            Action::Pause => state.status.state = PlaybackState::Paused,
            Action::SetVolume(level) => state.status.volume = *level,
            Action::SelectOutput(id) => {
                for device in &mut state.status.devices {
                    device.is_active = device.id == *id;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<Device>, ActionError> {
        Ok(self.state.lock().unwrap().status.devices.clone())
    }

    async fn playlists(&self) -> Result<Vec<Playlist>, ActionError> {
        Ok(self.state.lock().unwrap().playlists.clone())
    }

    async fn tracks(&self, playlist: &Playlist) -> Result<Vec<Track>, ActionError> {
        self.state
            .lock()
            .unwrap()
            .playlists
            .iter()
            .find(|p| p.id == playlist.id)
            .map(|p| p.tracks.clone())
            .ok_or_else(|| ActionError::InvalidArgument(format!("no playlist {}", playlist.id)))
    }
}

/// Hands out a `FakeBackend` per config and remembers them by player name
#[derive(Default)]
pub struct FakeFactory {
    backends: Mutex<Vec<(String, Arc<FakeBackend>)>>,
    unreachable: Mutex<HashSet<String>>,
    held: Mutex<HashSet<String>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backends created for `name` will refuse connections
    pub fn make_unreachable(&self, name: &str) {
        self.unreachable.lock().unwrap().insert(name.to_string());
    }

    /// The next backend created for `name` holds its first fetch
    pub fn hold_first_fetch(&self, name: &str) {
        self.held.lock().unwrap().insert(name.to_string());
    }

    pub fn factory(self: &Arc<Self>) -> BackendFactory {
        let this = Arc::clone(self);
        Arc::new(move |config: &PlayerConfig| {
            let backend = FakeBackend::new();
            if this.unreachable.lock().unwrap().contains(&config.name) {
                backend.set_fetch_error(Some(refused()));
            }
            if this.held.lock().unwrap().remove(&config.name) {
                backend.hold_next_fetch();
            }
            this.backends
                .lock()
                .unwrap()
                .push((config.name.clone(), Arc::clone(&backend)));
            let backend: Arc<dyn PlayerBackend> = backend;
            Ok::<_, ConnectError>(backend)
        })
    }

    /// Latest backend created for `name`
    pub fn backend(&self, name: &str) -> Arc<FakeBackend> {
        self.backends
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, b)| Arc::clone(b))
            .expect("no backend created for this name")
    }

    pub fn created(&self) -> usize {
        self.backends.lock().unwrap().len()
    }
}

pub fn refused() -> FetchError {
    FetchError::Transport(TransportError::Network("connection refused".to_string()))
}

pub fn idle_status() -> Status {
    Status {
        volume: 50,
        devices: vec![
            Device { id: "1".into(), name: "Speakers".into(), is_active: true },
            Device { id: "2".into(), name: "Headphones".into(), is_active: false },
        ],
        ..Default::default()
    }
}

pub fn track(id: &str, name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn playlist(id: &str, name: &str, tracks: Vec<Track>) -> Playlist {
    Playlist {
        id: id.to_string(),
        name: name.to_string(),
        tracks,
    }
}

/// Options with a poll period long enough to stay out of the way
pub fn quiet_options() -> SessionOptions {
    SessionOptions {
        poll_interval: Duration::from_secs(3600),
    }
}

pub fn fast_options() -> SessionOptions {
    SessionOptions {
        poll_interval: Duration::from_secs(1),
    }
}

pub fn session_with(backend: &Arc<FakeBackend>, config: PlayerConfig, options: SessionOptions) -> PlayerSession {
    let backend: Arc<dyn PlayerBackend> = Arc::clone(backend) as Arc<dyn PlayerBackend>;
    PlayerSession::new(1, config, backend, options)
}

pub fn quiet_session(backend: &Arc<FakeBackend>) -> PlayerSession {
    session_with(backend, PlayerConfig::vlc("Desk", "secret"), quiet_options())
}
