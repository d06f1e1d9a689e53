use crate::model::SessionKey;
use std::time::Duration;
use thiserror::Error;

pub type SessionResult<T> = Result<T, NarratorError>;

/// Coarse classification callers use to pick a user-visible failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AlreadyExists,
    NotFound,
    InvalidInput,
    MalformedTurn,
    Unavailable,
    Internal,
}

/// Errors surfaced by the conversation store and the narrator.
#[derive(Debug, Error)]
pub enum NarratorError {
    /// A live story already exists for this key.
    #[error("story with key {0} already exists")]
    AlreadyExists(SessionKey),
    /// No live story exists for this key (never created, or expired).
    #[error("story with key {0} does not exist")]
    NotFound(SessionKey),
    /// The submitted choice was not among the choices last offered.
    #[error("choice {choice:?} is not valid")]
    InvalidChoice { choice: String },
    /// The model reply did not decode to a turn.
    #[error("failed to decode turn: {0}")]
    MalformedTurn(String),
    /// Session keys must be non-empty.
    #[error("session key must not be empty")]
    EmptyKey,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl NarratorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            NarratorError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            NarratorError::NotFound(_) => ErrorCode::NotFound,
            NarratorError::InvalidChoice { .. } | NarratorError::EmptyKey => {
                ErrorCode::InvalidInput
            }
            NarratorError::MalformedTurn(_) => ErrorCode::MalformedTurn,
            NarratorError::Gateway(_) => ErrorCode::Unavailable,
            NarratorError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Failures of the remote chat-completion call.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion service returned no content")]
    EmptyReply,
    #[error("completion was cancelled")]
    Cancelled,
    #[error("completion timed out after {0:?}")]
    TimedOut(Duration),
}

/// Problems loading or validating [`crate::config::NarratorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("failed to convert {name} to integer: {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub(crate) fn not_found(key: &SessionKey) -> NarratorError {
    NarratorError::NotFound(key.clone())
}

pub(crate) fn already_exists(key: &SessionKey) -> NarratorError {
    NarratorError::AlreadyExists(key.clone())
}

pub(crate) fn malformed(err: serde_json::Error) -> NarratorError {
    NarratorError::MalformedTurn(err.to_string())
}
