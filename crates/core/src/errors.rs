//! Error taxonomy shared by the transport, the parsers and the sessions.
//!
//! Every failure is returned to the immediate caller. Nothing here retries.

use thiserror::Error;

/// A failed HTTP round trip
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("player returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl TransportError {
    /// Errors after which a polling session gives up and disconnects
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransportError::Network(_) | TransportError::Auth(_))
    }
}

/// A status or listing document that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    MalformedXml(String),

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidField { field: &'static str, value: String },
}

/// Failure of one status round trip (request plus decode)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Transport(e) if e.is_fatal())
    }
}

/// Failure while establishing a session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("connection failed: {0}")]
    Transport(#[from] TransportError),

    #[error("player sent an unreadable status: {0}")]
    Parse(#[from] ParseError),

    #[error("session is already connected")]
    AlreadyConnected,

    #[error("disconnected while connecting")]
    Cancelled,

    #[error("invalid player configuration: {0}")]
    InvalidConfig(String),
}

impl From<FetchError> for ConnectError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => ConnectError::Transport(e),
            FetchError::Parse(e) => ConnectError::Parse(e),
        }
    }
}

/// Failure of a player command or query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("player is not connected")]
    NotConnected,

    #[error("action '{0}' is not supported by this player")]
    Unsupported(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("command failed: {0}")]
    Transport(#[from] TransportError),

    #[error("player sent an unreadable response: {0}")]
    Parse(#[from] ParseError),
}

impl From<FetchError> for ActionError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => ActionError::Transport(e),
            FetchError::Parse(e) => ActionError::Parse(e),
        }
    }
}
