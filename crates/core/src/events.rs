//! Per-session event channel with persistent and single-shot listeners.

use crate::models::Status;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    StatusUpdate(Status),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    Disconnected,
    StatusUpdate,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::Connected => EventKind::Connected,
            SessionEvent::Disconnected => EventKind::Disconnected,
            SessionEvent::StatusUpdate(_) => EventKind::StatusUpdate,
        }
    }
}

/// Fan-out of session events to any number of listeners
#[derive(Clone, Debug)]
pub struct EventHub {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Deliver to current listeners; no listeners is not an error
    pub fn emit(&self, event: SessionEvent) {
        tracing::trace!("Session event: {:?}", event.kind());
        let _ = self.tx.send(event);
    }

    /// Persistent subscription receiving every event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Single-shot listener for the next event of `kind`
    ///
    /// The subscription starts when this is called, not when it is awaited.
    pub fn once(&self, kind: EventKind) -> OnceListener {
        OnceListener {
            rx: self.tx.subscribe(),
            kind,
        }
    }
}

pub struct OnceListener {
    rx: broadcast::Receiver<SessionEvent>,
    kind: EventKind,
}

impl OnceListener {
    /// Resolves with the first matching event, or `None` once the hub is gone
    pub async fn wait(mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.kind() == self.kind => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event listener lagged, skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
