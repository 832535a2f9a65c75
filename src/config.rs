//! Configuration management for hfchat.
//!
//! Configuration is loaded from `~/.config/hfchat/config.toml` unless a path
//! is given on the command line. The file has three sections:
//!
//! ```toml
//! [login]
//! email = "you@example.com"
//! password = "secret"
//!
//! [token]
//! token = "..."
//!
//! [chat]
//! model = "mistralai/Mixtral-8x7B-Instruct-v0.1"
//! endpoint = "https://huggingface.co"
//! ```
//!
//! `login` is required. `token` is written back after a successful login.
//! Unknown keys are ignored.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    /// Account credentials.
    pub login: Credentials,
    /// Cached session token from a previous login.
    pub token: TokenConfig,
    /// Chat endpoint settings.
    pub chat: ChatConfig,
}

/// Credentials submitted to the login form.
#[derive(Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cached session token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<String>,
}

/// Chat endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the chat service. Login and chat paths hang off it.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_model() -> String {
    "mistralai/Mixtral-8x7B-Instruct-v0.1".to_string()
}

fn default_endpoint() -> String {
    "https://huggingface.co".to_string()
}

/// On-disk shape before validation. Every field is optional so a missing
/// credential is reported as [`ConfigError::MissingKey`] rather than a
/// generic parse failure.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    login: RawLogin,
    #[serde(default)]
    token: TokenConfig,
    #[serde(default)]
    chat: ChatConfig,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogin {
    email: Option<String>,
    password: Option<String>,
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingKey(key)),
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let email = required(raw.login.email, "login.email")?;
        let password = required(raw.login.password, "login.password")?;
        Ok(Self {
            login: Credentials { email, password },
            token: raw.token,
            chat: raw.chat,
        })
    }
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hfchat"))
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Load and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config file {}", path.display());
        Self::parse(&contents)
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        Self::try_from(raw)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Wrote config file {}", path.display());
        Ok(())
    }

    /// Starter file written by `hfchat config`. Fails validation until the
    /// user fills in a password.
    pub fn template() -> String {
        r#"# TOML format: string values must be quoted.
[login]
email = "you@example.com"
password = ""

[chat]
model = "mistralai/Mixtral-8x7B-Instruct-v0.1"
# endpoint = "https://huggingface.co"
"#
        .to_string()
    }

    /// Record a session token.
    pub fn set_token(&mut self, token: impl Into<String>, expire_date: Option<String>) {
        self.token = TokenConfig {
            token: Some(token.into()),
            expire_date,
        };
    }

    /// Forget the cached session token.
    pub fn clear_token(&mut self) {
        self.token = TokenConfig::default();
    }

    /// Whether a non-empty token is cached.
    pub fn is_logged_in(&self) -> bool {
        self.cached_token().is_some()
    }

    pub fn cached_token(&self) -> Option<&str> {
        self.token.token.as_deref().filter(|t| !t.is_empty())
    }

    /// URL of the login form.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.chat.endpoint.trim_end_matches('/'))
    }

    /// URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!(
            "{}/chat/conversation",
            self.chat.endpoint.trim_end_matches('/')
        )
    }
}
