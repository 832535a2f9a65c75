//! Error types for hfchat.
//!
//! Each layer has its own error enum so callers can tell a broken config file
//! from a rejected login or an expired session. [`Error`] unifies them for
//! code that talks to the chat endpoint.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file (TOML syntax, string values must be quoted): {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required config key `{0}`")]
    MissingKey(&'static str),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures during the login handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials (remote answered {status})")]
    InvalidCredentials { status: u16 },

    /// The remote accepted the login but did not hand out a session token.
    /// Usually means the login flow changed upstream.
    #[error("login succeeded but no `{cookie}` cookie was returned")]
    MissingToken { cookie: &'static str },

    #[error("unexpected login response: status {status}")]
    UnexpectedResponse { status: u16 },

    #[error("network error during login: {0}")]
    Network(#[from] reqwest::Error),
}

/// Failures tied to the session state when sending a chat request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("not logged in; run /login first")]
    NotAuthenticated,

    #[error("session expired (remote answered {status}); log in again")]
    SessionExpired { status: u16 },

    #[error("chat endpoint rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("chat session has ended")]
    Ended,
}

/// Top-level error for chat operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl Error {
    /// True when the remote told us the session is no longer valid.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Request(RequestError::SessionExpired { .. }))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
