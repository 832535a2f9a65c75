//! Chat request wrapper.
//!
//! Sends one prompt per call to the chat endpoint using an existing session
//! and hands back the raw response body.

use crate::auth::{Session, USER_AGENT};
use crate::error::{RequestError, Result};
use crate::protocol::{ChatRequest, ChatResponse};
use reqwest::header::{COOKIE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

pub struct ChatClient {
    chat_url: String,
    client: Client,
}

impl ChatClient {
    /// Create a chat client posting to `chat_url`.
    pub fn new(chat_url: String) -> Result<Self, reqwest::Error> {
        // An expired session shows up as a redirect to the login page.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { chat_url, client })
    }

    /// Submit `request` with `session`. Single round trip, no retry.
    pub async fn send(&self, session: &Session, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            "Sending {} byte prompt to {} (model {})",
            request.prompt().len(),
            self.chat_url,
            request.model()
        );

        let response = self
            .client
            .post(&self.chat_url)
            .header(COOKIE, session.cookie_header())
            .json(&request.payload())
            .send()
            .await?;

        let status = response.status();
        debug!("Chat response status: {}", status);

        if is_session_expired(status, response.headers().get(LOCATION)) {
            return Err(RequestError::SessionExpired {
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(RequestError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
            .into());
        }

        Ok(ChatResponse::new(status.as_u16(), body))
    }
}

fn is_session_expired(status: StatusCode, location: Option<&reqwest::header::HeaderValue>) -> bool {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => true,
        s if s.is_redirection() => location
            .and_then(|v| v.to_str().ok())
            .is_some_and(|l| l.contains("/login")),
        _ => false,
    }
}
