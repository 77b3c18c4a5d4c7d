//! Session Registry / Controller.
//!
//! Owns the loaded player configs and the live sessions keyed by config id,
//! and routes user intents to the right session. Picking between candidates
//! is left to the caller: the controller only lists them and applies the
//! final choice.

use crate::backends::create_backend;
use crate::session::{PlayerSession, SessionOptions};
use scribectl_core::{
    split_terms, search, ActionError, Candidate, ConfigId, ConfiguredPlayer, ConnectError, Device, EventKind,
    PlayerBackend, PlayerConfig, Playlist, Track,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Creates the backend for a config; swapped out in tests
pub type BackendFactory =
    Arc<dyn Fn(&PlayerConfig) -> Result<Arc<dyn PlayerBackend>, ConnectError> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("no player with id {0}")]
    UnknownConfig(ConfigId),

    #[error("player {0} already has a live session")]
    AlreadyConnected(ConfigId),

    #[error("player {0} is not connected")]
    NotConnected(ConfigId),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// What `Controller::search` looks through
#[derive(Clone, Debug, PartialEq)]
pub enum SearchKind {
    Playlists,
    Tracks(Playlist),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchResults {
    Playlists(Vec<Playlist>),
    Tracks(Vec<Track>),
}

impl SearchResults {
    pub fn candidates(&self) -> Vec<Candidate> {
        match self {
            SearchResults::Playlists(items) => items.iter().map(Candidate::from).collect(),
            SearchResults::Tracks(items) => items.iter().map(Candidate::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SearchResults::Playlists(items) => items.len(),
            SearchResults::Tracks(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct Registry {
    configs: Vec<ConfiguredPlayer>,
    sessions: HashMap<ConfigId, PlayerSession>,
    /// Ids with a connect in progress
    pending: HashSet<ConfigId>,
}

pub struct Controller {
    registry: Arc<RwLock<Registry>>,
    next_id: AtomicU64,
    factory: BackendFactory,
    options: SessionOptions,
}

impl Controller {
    pub fn new(factory: BackendFactory, options: SessionOptions) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            next_id: AtomicU64::new(1),
            factory,
            options,
        }
    }

    /// Controller building VLC and Spotify backends from config
    pub fn with_default_backends(options: SessionOptions) -> Self {
        Self::new(Arc::new(create_backend), options)
    }

    /// Replace the known configs, giving each a fresh id in array order
    ///
    /// Live sessions are left alone; use `reload` to reconnect as well. A
    /// connect still in flight for a replaced config fails with `UnknownConfig`.
    pub async fn load(&self, configs: Vec<PlayerConfig>) -> Vec<ConfiguredPlayer> {
        let players: Vec<ConfiguredPlayer> = configs
            .into_iter()
            .map(|config| ConfiguredPlayer {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                config,
            })
            .collect();

        let mut registry = self.registry.write().await;
        registry.configs = players.clone();
        // Connects still in flight belong to the old ids and will not register
        registry.pending.clear();
        drop(registry);
        tracing::debug!("Loaded {} player config(s)", players.len());
        players
    }

    pub async fn configured(&self) -> Vec<ConfiguredPlayer> {
        self.registry.read().await.configs.clone()
    }

    /// Look a configured player up by id or by name (case-insensitive)
    pub async fn find(&self, selector: &str) -> Option<ConfiguredPlayer> {
        let registry = self.registry.read().await;
        let by_id = selector.trim().parse::<ConfigId>().ok();
        registry
            .configs
            .iter()
            .find(|p| Some(p.id) == by_id || p.config.name.eq_ignore_ascii_case(selector.trim()))
            .cloned()
    }

    /// Configured players without a live or pending session
    pub async fn connect_candidates(&self) -> Vec<ConfiguredPlayer> {
        let registry = self.registry.read().await;
        registry
            .configs
            .iter()
            .filter(|p| !registry.sessions.contains_key(&p.id) && !registry.pending.contains(&p.id))
            .cloned()
            .collect()
    }

    /// Live sessions in config id order
    pub async fn sessions(&self) -> Vec<PlayerSession> {
        let registry = self.registry.read().await;
        let mut sessions: Vec<PlayerSession> = registry.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.config_id());
        sessions
    }

    pub async fn session_candidates(&self) -> Vec<Candidate> {
        self.sessions()
            .await
            .iter()
            .map(|s| Candidate {
                id: s.config_id().to_string(),
                label: s.config().label(),
                detail: Some("connected".to_string()),
            })
            .collect()
    }

    pub async fn session(&self, id: ConfigId) -> Result<PlayerSession, ControllerError> {
        self.registry
            .read()
            .await
            .sessions
            .get(&id)
            .cloned()
            .ok_or(ControllerError::NotConnected(id))
    }

    /// Open a session for a configured player and register it
    pub async fn connect(&self, id: ConfigId) -> Result<PlayerSession, ControllerError> {
        let config = {
            let mut registry = self.registry.write().await;
            let player = registry
                .configs
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(ControllerError::UnknownConfig(id))?;
            if registry.sessions.contains_key(&id) || registry.pending.contains(&id) {
                return Err(ControllerError::AlreadyConnected(id));
            }
            registry.pending.insert(id);
            player.config
        };

        let opened = self.open_session(id, config).await;

        let mut registry = self.registry.write().await;
        registry.pending.remove(&id);
        let session = opened?;

        // The config was replaced by a load or reload while connecting
        if !registry.configs.iter().any(|p| p.id == id) {
            drop(registry);
            tracing::debug!("Player {} was unloaded while connecting, dropping session", id);
            session.disconnect().await;
            return Err(ControllerError::UnknownConfig(id));
        }

        // A disconnect that landed before this point already fired its listener
        if !session.is_connected().await {
            return Err(ControllerError::Connect(ConnectError::Cancelled));
        }

        registry.sessions.insert(id, session.clone());
        tracing::info!("Registered session for player {} '{}'", id, session.name());
        Ok(session)
    }

    async fn open_session(&self, id: ConfigId, config: PlayerConfig) -> Result<PlayerSession, ControllerError> {
        let backend = (self.factory)(&config)?;
        let session = PlayerSession::new(id, config, backend, self.options.clone());

        // Subscribed before connecting so no Disconnected can be missed
        let listener = session.once(EventKind::Disconnected);
        session.connect().await?;

        let registry = Arc::downgrade(&self.registry);
        let uid = session.uid();
        tokio::spawn(async move {
            if listener.wait().await.is_none() {
                return;
            }
            let Some(registry) = registry.upgrade() else { return };
            let mut registry = registry.write().await;
            if registry.sessions.get(&id).map(|s| s.uid()) == Some(uid) {
                registry.sessions.remove(&id);
                tracing::info!("Removed disconnected session for player {}", id);
            }
        });

        Ok(session)
    }

    /// Remove and tear down one live session
    pub async fn disconnect(&self, id: ConfigId) -> Result<(), ControllerError> {
        let session = self
            .registry
            .write()
            .await
            .sessions
            .remove(&id)
            .ok_or(ControllerError::NotConnected(id))?;

        session.disconnect().await;
        Ok(())
    }

    /// Disconnect every live session
    pub async fn teardown(&self) {
        let sessions: Vec<PlayerSession> = {
            let mut registry = self.registry.write().await;
            let mut drained: Vec<PlayerSession> = registry.sessions.drain().map(|(_, s)| s).collect();
            drained.sort_by_key(|s| s.config_id());
            drained
        };

        for session in sessions {
            session.disconnect().await;
        }
    }

    /// Tear everything down, load `configs` and connect the startup players
    ///
    /// Connections are made one after another in config order.
    pub async fn reload(
        &self,
        configs: Vec<PlayerConfig>,
    ) -> Vec<(ConfiguredPlayer, Result<(), ControllerError>)> {
        self.teardown().await;
        let players = self.load(configs).await;

        let mut results = Vec::new();
        for player in players.into_iter().filter(|p| p.config.connect_on_startup) {
            let result = self.connect(player.id).await.map(|_| ());
            if let Err(e) = &result {
                tracing::warn!("Could not connect '{}' on startup: {}", player.config.name, e);
            }
            results.push((player, result));
        }
        results
    }

    pub async fn playlists(&self, id: ConfigId) -> Result<Vec<Playlist>, ControllerError> {
        Ok(self.session(id).await?.get_playlists().await?)
    }

    pub async fn tracks(&self, id: ConfigId, playlist: &Playlist) -> Result<Vec<Track>, ControllerError> {
        Ok(self.session(id).await?.get_tracks(playlist).await?)
    }

    /// Outputs in the order the player reported them
    pub async fn outputs(&self, id: ConfigId) -> Result<Vec<Device>, ControllerError> {
        Ok(self.session(id).await?.get_devices().await?)
    }

    /// Playlists or tracks whose name contains every term of `query`
    pub async fn search(
        &self,
        id: ConfigId,
        kind: SearchKind,
        query: &str,
    ) -> Result<SearchResults, ControllerError> {
        let terms = split_terms(query);
        let results = match kind {
            SearchKind::Playlists => {
                let playlists = self.playlists(id).await?;
                SearchResults::Playlists(search(&terms, &playlists).into_iter().cloned().collect())
            }
            SearchKind::Tracks(playlist) => {
                let tracks = self.tracks(id, &playlist).await?;
                SearchResults::Tracks(search(&terms, &tracks).into_iter().cloned().collect())
            }
        };

        tracing::debug!("Search {:?} on player {} found {} result(s)", query, id, results.len());
        Ok(results)
    }

    pub async fn select_output(&self, id: ConfigId, device_id: &str) -> Result<(), ControllerError> {
        Ok(self.session(id).await?.select_output(device_id).await?)
    }

    pub async fn select_playlist_item(&self, id: ConfigId, track_id: &str) -> Result<(), ControllerError> {
        Ok(self.session(id).await?.select_playlist_item(track_id).await?)
    }
}
