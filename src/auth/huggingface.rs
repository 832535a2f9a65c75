//! Hugging Face login adapter.
//!
//! Posts the email/password form to `/login`. A successful login answers
//! `302 Found` and sets the `token` cookie; a rejected one re-renders the
//! form with `200`.

use super::{Authenticator, Session, TOKEN_COOKIE, USER_AGENT};
use crate::config::Credentials;
use crate::error::AuthError;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::time::{Duration, SystemTime};
use tracing::debug;

pub struct HuggingFaceAuthenticator {
    login_url: String,
    client: Client,
}

impl HuggingFaceAuthenticator {
    /// Create an authenticator posting to `login_url`.
    pub fn new(login_url: String) -> Result<Self, reqwest::Error> {
        // The redirect itself is the success signal, so it must not be followed.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { login_url, client })
    }
}

#[async_trait]
impl Authenticator for HuggingFaceAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let form = [
            ("username", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
        ];

        let response = self
            .client
            .post(&self.login_url)
            .basic_auth(&credentials.email, Some(&credentials.password))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        debug!("Login response status: {}", status);

        match status {
            StatusCode::FOUND => response
                .cookies()
                .find(|c| c.name() == TOKEN_COOKIE && !c.value().is_empty())
                .map(|c| {
                    let expires_at = c
                        .expires()
                        .or_else(|| c.max_age().map(|age| SystemTime::now() + age));
                    Session::new(c.value()).with_expiry(expires_at)
                })
                .ok_or(AuthError::MissingToken {
                    cookie: TOKEN_COOKIE,
                }),
            StatusCode::OK | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AuthError::InvalidCredentials {
                    status: status.as_u16(),
                })
            }
            _ => Err(AuthError::UnexpectedResponse {
                status: status.as_u16(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
