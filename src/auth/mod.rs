//! Authentication against the remote chat service.
//!
//! The remote login flow is an undocumented web form, so everything that
//! knows its shape lives behind the [`Authenticator`] trait. [`AuthClient`]
//! runs the handshake once and keeps the resulting [`Session`] until it is
//! invalidated or the user logs out.

pub mod huggingface;

use crate::config::{Config, Credentials};
use crate::error::AuthError;
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub use huggingface::HuggingFaceAuthenticator;

/// Browser User-Agent sent with every request. The login page rejects
/// unfamiliar clients.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// An authenticated session: the token cookie handed out at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    expires_at: Option<SystemTime>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<SystemTime>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Cookie` header value for authenticated requests.
    pub fn cookie_header(&self) -> String {
        format!("{}={}", TOKEN_COOKIE, self.token)
    }

    /// Expiry as Unix seconds, the form stored in the config file.
    pub fn expire_date(&self) -> Option<String> {
        self.expires_at
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs().to_string())
    }

    /// Rebuild a session from a cached token and optional Unix-seconds expiry.
    pub fn from_cache(token: &str, expire_date: Option<&str>) -> Self {
        let expires_at = expire_date
            .and_then(|s| s.parse::<u64>().ok())
            .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));
        Self::new(token).with_expiry(expires_at)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Performs the remote login handshake.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Submit `credentials` and return the session the remote hands out.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Owns the current session. There is no token refresh: a new session
/// requires a full [`AuthClient::login`].
pub struct AuthClient {
    authenticator: Box<dyn Authenticator>,
    session: Option<Session>,
}

impl AuthClient {
    pub fn new(authenticator: Box<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            session: None,
        }
    }

    /// Log in with the credentials from `config`. Any previous session is
    /// dropped first, so a failed login leaves the client unauthenticated.
    pub async fn login(&mut self, config: &Config) -> Result<&Session, AuthError> {
        self.session = None;
        info!(
            "Logging in as {} via {}",
            config.login.email,
            self.authenticator.name()
        );
        match self.authenticator.authenticate(&config.login).await {
            Ok(session) => {
                info!("Login successful");
                Ok(&*self.session.insert(session))
            }
            Err(e) => {
                warn!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    /// The cached session, if a login has succeeded.
    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Adopt a session obtained earlier, e.g. a token cached on disk.
    pub fn restore(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Discard the session.
    pub fn invalidate(&mut self) -> Option<Session> {
        self.session.take()
    }
}
