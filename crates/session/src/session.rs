//! Player Session: one live connection to one configured player.
//!
//! A session owns its backend, its latest status snapshot and its poll task.
//! Every status fetch goes through a per-session single-flight lock, and is
//! tagged with the connection generation it was issued under so that a
//! response arriving after `disconnect()` is dropped instead of applied.

use scribectl_core::{
    Action, ActionError, ActionKind, ConfigId, ConnectError, Device, EventHub, EventKind, FetchError,
    OnceListener, PlayerBackend, PlayerConfig, PlayerKind, Playlist, SessionEvent, Status, Track,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

static NEXT_SESSION_UID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub poll_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Result of one status fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Refresh {
    Updated,
    Unchanged,
    /// The session disconnected (or reconnected) while the request was out
    Discarded,
}

struct SessionInner {
    uid: u64,
    config_id: ConfigId,
    config: PlayerConfig,
    backend: Arc<dyn PlayerBackend>,
    options: SessionOptions,
    state: RwLock<SessionState>,
    status: RwLock<Option<Status>>,
    /// Bumped on every connect and disconnect, always under the state lock
    generation: AtomicU64,
    /// Held for the duration of every status fetch
    in_flight: Mutex<()>,
    events: EventHub,
    /// Poll task token, tagged with the generation that started it
    poll: Mutex<Option<(u64, CancellationToken)>>,
}

/// Handle to a player session; clones share the same session
#[derive(Clone)]
pub struct PlayerSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for PlayerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSession")
            .field("uid", &self.inner.uid)
            .field("config_id", &self.inner.config_id)
            .field("name", &self.inner.config.name)
            .finish()
    }
}

impl PlayerSession {
    pub fn new(
        config_id: ConfigId,
        config: PlayerConfig,
        backend: Arc<dyn PlayerBackend>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                uid: NEXT_SESSION_UID.fetch_add(1, Ordering::Relaxed),
                config_id,
                config,
                backend,
                options,
                state: RwLock::new(SessionState::Disconnected),
                status: RwLock::new(None),
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(()),
                events: EventHub::new(),
                poll: Mutex::new(None),
            }),
        }
    }

    /// Unique per session object, unlike `config_id`
    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    pub fn config_id(&self) -> ConfigId {
        self.inner.config_id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    pub fn kind(&self) -> PlayerKind {
        self.inner.backend.kind()
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn supported_actions(&self) -> &'static [ActionKind] {
        self.inner.backend.supported_actions()
    }

    pub fn custom_actions(&self) -> &'static [&'static str] {
        self.inner.backend.custom_actions()
    }

    pub async fn state(&self) -> SessionState {
        *self.inner.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == SessionState::Connected
    }

    /// Latest snapshot; kept after disconnect, `None` before the first connect
    pub async fn current_status(&self) -> Option<Status> {
        self.inner.status.read().await.clone()
    }

    /// Persistent subscription to this session's events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Single-shot listener for the next event of `kind`
    pub fn once(&self, kind: EventKind) -> OnceListener {
        self.inner.events.once(kind)
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Connect: fetch the first status, apply the initial output and start polling
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let generation = {
            let mut state = self.inner.state.write().await;
            if *state != SessionState::Disconnected {
                return Err(ConnectError::AlreadyConnected);
            }
            *state = SessionState::Connecting;
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        tracing::info!(
            "Connecting to {} player '{}' ({}:{})",
            self.kind(),
            self.name(),
            self.inner.config.host,
            self.inner.config.port
        );

        let fetched = {
            let _guard = self.inner.in_flight.lock().await;
            self.inner.backend.fetch_status().await
        };

        let status = {
            let mut state = self.inner.state.write().await;
            if *state != SessionState::Connecting || self.generation() != generation {
                return Err(ConnectError::Cancelled);
            }

            match fetched {
                Ok(status) => {
                    *self.inner.status.write().await = Some(status.clone());
                    *state = SessionState::Connected;
                    self.inner.events.emit(SessionEvent::Connected);
                    self.inner.events.emit(SessionEvent::StatusUpdate(status.clone()));
                    status
                }
                Err(e) => {
                    *state = SessionState::Disconnected;
                    tracing::warn!("Failed to connect to '{}': {}", self.name(), e);
                    return Err(e.into());
                }
            }
        };

        tracing::info!("Connected to '{}'", self.name());

        self.apply_initial_output(&status).await;

        // A disconnect (or a newer connect) may have landed while the output was applied
        let state = self.inner.state.read().await;
        if *state != SessionState::Connected || self.generation() != generation {
            tracing::debug!("Connect to '{}' superseded before polling started", self.name());
            return Err(ConnectError::Cancelled);
        }
        self.start_polling(generation).await;
        drop(state);
        Ok(())
    }

    /// Disconnect; returns false when the session was already disconnected
    ///
    /// Makes no transport calls. Requests still in flight are discarded when
    /// they complete.
    pub async fn disconnect(&self) -> bool {
        self.disconnect_generation(None).await
    }

    async fn disconnect_generation(&self, expected: Option<u64>) -> bool {
        {
            let mut state = self.inner.state.write().await;
            if *state == SessionState::Disconnected {
                return false;
            }
            if expected.is_some_and(|g| g != self.generation()) {
                return false;
            }
            *state = SessionState::Disconnected;
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
        }

        if let Some((_, token)) = self.inner.poll.lock().await.take() {
            token.cancel();
        }

        tracing::info!("Disconnected from '{}'", self.name());
        self.inner.events.emit(SessionEvent::Disconnected);
        true
    }

    async fn apply_initial_output(&self, status: &Status) {
        let config = &self.inner.config;

        // The default output only applies when nothing is playing anywhere
        let use_default = status.active_device().is_none();
        let wanted_name = config
            .initial_output
            .clone()
            .or_else(|| config.default_output_name.clone().filter(|_| use_default));
        let wanted_id = config.default_output_id.clone().filter(|_| use_default);

        if wanted_name.is_none() && wanted_id.is_none() {
            return;
        }
        if !self.inner.backend.supports(ActionKind::SelectOutput) {
            tracing::warn!("'{}' cannot select outputs, ignoring initial output", self.name());
            return;
        }

        let devices = match self.get_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!("Could not list outputs of '{}': {}", self.name(), e);
                return;
            }
        };

        let found = devices.iter().find(|d| {
            wanted_id.as_deref() == Some(d.id.as_str())
                || wanted_name
                    .as_deref()
                    .is_some_and(|name| d.name.eq_ignore_ascii_case(name))
        });

        match found {
            Some(device) if device.is_active => {}
            Some(device) => {
                tracing::info!("Selecting initial output '{}' on '{}'", device.name, self.name());
                if let Err(e) = self.select_output(&device.id).await {
                    tracing::warn!("Failed to select output '{}': {}", device.name, e);
                }
            }
            None => tracing::warn!(
                "Initial output {:?} not found on '{}'",
                wanted_name.or(wanted_id).unwrap_or_default(),
                self.name()
            ),
        }
    }

    /// Caller holds the state lock and has checked `generation` is current
    async fn start_polling(&self, generation: u64) {
        let token = CancellationToken::new();
        let mut poll = self.inner.poll.lock().await;
        if let Some((previous_generation, previous)) = poll.replace((generation, token.clone())) {
            if previous_generation < generation {
                previous.cancel();
            }
        }
        drop(poll);

        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        let period = self.inner.options.poll_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        let session = PlayerSession { inner };
                        if !session.poll_once(generation).await {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Status polling stopped");
        });
    }

    /// One poll tick; returns false when polling should stop
    async fn poll_once(&self, generation: u64) -> bool {
        let Ok(guard) = self.inner.in_flight.try_lock() else {
            tracing::trace!("Status fetch already in flight for '{}', skipping tick", self.name());
            return true;
        };

        match self.fetch_and_apply(generation).await {
            Ok(Refresh::Discarded) => false,
            Ok(_) => true,
            Err(e) if e.is_fatal() => {
                drop(guard);
                tracing::warn!("Lost connection to '{}': {}", self.name(), e);
                self.disconnect_generation(Some(generation)).await;
                false
            }
            Err(e) => {
                tracing::warn!("Status poll for '{}' failed: {}", self.name(), e);
                true
            }
        }
    }

    async fn refresh_status(&self, generation: u64) -> Result<Refresh, FetchError> {
        let _guard = self.inner.in_flight.lock().await;
        self.fetch_and_apply(generation).await
    }

    /// Fetch status and replace the snapshot; caller holds `in_flight`
    async fn fetch_and_apply(&self, generation: u64) -> Result<Refresh, FetchError> {
        let status = self.inner.backend.fetch_status().await?;

        let state = self.inner.state.read().await;
        if *state != SessionState::Connected || self.generation() != generation {
            tracing::debug!("Discarding late status for '{}'", self.name());
            return Ok(Refresh::Discarded);
        }

        let mut current = self.inner.status.write().await;
        if current.as_ref() == Some(&status) {
            return Ok(Refresh::Unchanged);
        }
        *current = Some(status.clone());
        drop(current);

        // Emitted under the state lock so it cannot follow a Disconnected
        self.inner.events.emit(SessionEvent::StatusUpdate(status));
        drop(state);
        Ok(Refresh::Updated)
    }

    async fn connected_snapshot(&self) -> Result<(u64, Option<Status>), ActionError> {
        let state = self.inner.state.read().await;
        if *state != SessionState::Connected {
            return Err(ActionError::NotConnected);
        }
        let generation = self.generation();
        let status = self.inner.status.read().await.clone();
        Ok((generation, status))
    }

    /// Fetch status now and return the new snapshot
    pub async fn refresh(&self) -> Result<Status, ActionError> {
        let (generation, _) = self.connected_snapshot().await?;
        if self.refresh_status(generation).await? == Refresh::Discarded {
            return Err(ActionError::NotConnected);
        }
        self.current_status().await.ok_or(ActionError::NotConnected)
    }

    /// Send one command, then resync status from the player
    async fn perform(&self, action: Action) -> Result<(), ActionError> {
        let (generation, current) = self.connected_snapshot().await?;

        let backend = &self.inner.backend;
        if !backend.supports(action.kind()) {
            return Err(ActionError::Unsupported(action.name()));
        }
        if let Action::Custom { name, .. } = &action {
            if !backend.custom_actions().iter().any(|a| *a == name.as_str()) {
                return Err(ActionError::Unsupported(name.clone()));
            }
        }

        tracing::debug!("'{}': {}", self.name(), action.name());
        if let Err(e) = backend.execute(&action, current.as_ref()).await {
            tracing::warn!("'{}' failed on '{}': {}", action.name(), self.name(), e);
            return Err(e);
        }

        match self.refresh_status(generation).await? {
            Refresh::Discarded => Err(ActionError::NotConnected),
            _ => Ok(()),
        }
    }

    pub async fn play(&self) -> Result<(), ActionError> {
        self.perform(Action::Play).await
    }

    pub async fn pause(&self) -> Result<(), ActionError> {
        self.perform(Action::Pause).await
    }

    pub async fn toggle_play(&self) -> Result<(), ActionError> {
        self.perform(Action::TogglePlay).await
    }

    pub async fn next(&self) -> Result<(), ActionError> {
        self.perform(Action::Next).await
    }

    pub async fn previous(&self) -> Result<(), ActionError> {
        self.perform(Action::Previous).await
    }

    pub async fn seek(&self, seconds: u64) -> Result<(), ActionError> {
        self.perform(Action::Seek(seconds)).await
    }

    /// Set the volume, clamped to the backend's range
    pub async fn set_volume(&self, level: u32) -> Result<(), ActionError> {
        let range = self.inner.backend.volume_range();
        let level = level.clamp(*range.start(), *range.end());
        self.perform(Action::SetVolume(level)).await
    }

    pub async fn toggle_mute(&self) -> Result<(), ActionError> {
        self.perform(Action::ToggleMute).await
    }

    pub async fn toggle_shuffle(&self) -> Result<(), ActionError> {
        self.perform(Action::ToggleShuffle).await
    }

    pub async fn toggle_repeat(&self) -> Result<(), ActionError> {
        self.perform(Action::ToggleRepeat).await
    }

    pub async fn select_output(&self, device_id: &str) -> Result<(), ActionError> {
        self.perform(Action::SelectOutput(device_id.to_string())).await
    }

    pub async fn select_playlist_item(&self, track_id: &str) -> Result<(), ActionError> {
        self.perform(Action::SelectPlaylistItem(track_id.to_string())).await
    }

    pub async fn play_track(&self, track: &Track) -> Result<(), ActionError> {
        self.select_playlist_item(&track.id).await
    }

    /// Run one of the backend's `custom_actions`
    pub async fn execute_action(&self, name: &str, arg: Option<&str>) -> Result<(), ActionError> {
        self.perform(Action::Custom {
            name: name.to_string(),
            arg: arg.map(str::to_string),
        })
        .await
    }

    async fn ensure_connected(&self) -> Result<(), ActionError> {
        self.connected_snapshot().await.map(|_| ())
    }

    pub async fn get_devices(&self) -> Result<Vec<Device>, ActionError> {
        self.ensure_connected().await?;
        self.inner.backend.devices().await
    }

    pub async fn get_playlists(&self) -> Result<Vec<Playlist>, ActionError> {
        self.ensure_connected().await?;
        self.inner.backend.playlists().await
    }

    pub async fn get_tracks(&self, playlist: &Playlist) -> Result<Vec<Track>, ActionError> {
        self.ensure_connected().await?;
        self.inner.backend.tracks(playlist).await
    }
}
