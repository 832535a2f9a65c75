//! Chat request and response types.
//!
//! The request body schema belongs to the remote service and may change
//! without notice; [`ChatPayload`] is the only place that knows it.

use bytes::Bytes;
use serde::Serialize;
use std::borrow::Cow;

/// One user turn: a prompt for a given model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    prompt: String,
    model: String,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn payload(&self) -> ChatPayload<'_> {
        ChatPayload {
            model: &self.model,
            inputs: &self.prompt,
        }
    }
}

/// JSON body posted to the chat endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct ChatPayload<'a> {
    pub model: &'a str,
    pub inputs: &'a str,
}

/// Raw payload returned by the chat endpoint. Not parsed or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    status: u16,
    body: Bytes,
}

impl ChatResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// The body exactly as received.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text for display. Invalid UTF-8 is replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
