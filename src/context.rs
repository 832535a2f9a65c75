//! Chat context: configuration, session and clients for one user.
//!
//! Drives the session state machine:
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated <-> Sending
//!        ^                 |                 |
//!        +-----------------+ (login failed)  +--> Ended
//!        +---------------------------------- (session expired)
//! ```

use crate::auth::{AuthClient, Authenticator, HuggingFaceAuthenticator, Session};
use crate::chat::ChatClient;
use crate::config::Config;
use crate::error::{ConfigError, RequestError, Result};
use crate::protocol::{ChatRequest, ChatResponse};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Sending,
    Ended,
}

pub struct ChatContext {
    config: Config,
    /// Where token changes are written back. `None` keeps them in memory.
    config_path: Option<PathBuf>,
    auth: AuthClient,
    chat: ChatClient,
    phase: Phase,
}

impl ChatContext {
    /// Build a context talking to the configured Hugging Face endpoint.
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Result<Self> {
        let authenticator = HuggingFaceAuthenticator::new(config.login_url())?;
        Self::with_authenticator(config, config_path, Box::new(authenticator))
    }

    pub fn with_authenticator(
        config: Config,
        config_path: Option<PathBuf>,
        authenticator: Box<dyn Authenticator>,
    ) -> Result<Self> {
        let chat = ChatClient::new(config.chat_url())?;
        Ok(Self {
            config,
            config_path,
            auth: AuthClient::new(authenticator),
            chat,
            phase: Phase::Unauthenticated,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> Option<&Session> {
        self.auth.current_session()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.phase == Phase::Ended {
            return Err(RequestError::Ended.into());
        }
        Ok(())
    }

    /// Adopt the token cached in the config file, if any. Returns whether a
    /// session is now active. The token is not verified until the next send.
    pub fn restore_cached(&mut self) -> bool {
        if self.phase == Phase::Ended {
            return false;
        }
        let Some(token) = self.config.cached_token() else {
            return false;
        };
        let session = Session::from_cache(token, self.config.token.expire_date.as_deref());
        self.auth.restore(session);
        self.phase = Phase::Authenticated;
        info!("Using cached session token");
        true
    }

    /// Run the login handshake and cache the new token. If the token cannot
    /// be written to the config file the error is returned, but the session
    /// stays active for this process.
    pub async fn login(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.phase = Phase::Authenticating;

        let session = match self.auth.login(&self.config).await {
            Ok(session) => session.clone(),
            Err(e) => {
                self.phase = Phase::Unauthenticated;
                return Err(e.into());
            }
        };

        self.phase = Phase::Authenticated;
        self.config.set_token(session.token(), session.expire_date());
        self.persist()?;
        Ok(())
    }

    /// Send one prompt. Fails without touching the network when there is no
    /// session. An expired session is dropped along with its cached token.
    pub async fn send(&mut self, prompt: &str) -> Result<ChatResponse> {
        self.ensure_open()?;
        let Some(session) = self.auth.current_session() else {
            return Err(RequestError::NotAuthenticated.into());
        };

        let request = ChatRequest::new(prompt, self.config.chat.model.as_str());
        self.phase = Phase::Sending;
        let result = self.chat.send(session, &request).await;

        match &result {
            Err(e) if e.is_session_expired() => {
                warn!("Session expired, logging out");
                if let Err(save_err) = self.drop_session() {
                    warn!("Failed to clear cached token: {}", save_err);
                }
            }
            _ => self.phase = Phase::Authenticated,
        }
        result
    }

    /// Forget the session and the cached token.
    pub fn logout(&mut self) -> Result<()> {
        if self.phase == Phase::Ended {
            return Ok(());
        }
        self.drop_session()?;
        info!("Logged out");
        Ok(())
    }

    /// Close the context. Every later operation fails with `Ended`.
    pub fn end(&mut self) {
        self.auth.invalidate();
        self.phase = Phase::Ended;
        debug!("Chat context ended");
    }

    fn drop_session(&mut self) -> Result<(), ConfigError> {
        self.auth.invalidate();
        self.phase = Phase::Unauthenticated;
        if self.config.is_logged_in() {
            self.config.clear_token();
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), ConfigError> {
        match &self.config_path {
            Some(path) => self.config.save(path),
            None => Ok(()),
        }
    }
}
