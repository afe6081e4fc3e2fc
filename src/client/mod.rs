//! Viewer-side client for the greeting API.
//!
//! Validates a name the same way the browser form does, then POSTs it
//! through a relay, following the relay's 307 retries with a cookie jar so
//! the `RedirectCount` cookie round-trips.

use std::time::Duration;

use regex::Regex;
use reqwest::{redirect, StatusCode};
use serde_json::json;

use crate::http::body::ReplyBody;

/// Letters, with at most two single spaces between words.
const NAME_PATTERN: &str = r"^[a-zA-Z]+(?: [a-zA-Z]+){0,2}$";

pub const MAX_NAME_LEN: usize = 30;

/// Upper bound on redirects followed for one call.
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("please input your name")]
    EmptyName,

    #[error("invalid name format: only letters and up to two spaces are allowed, max {MAX_NAME_LEN} characters")]
    InvalidName,

    #[error("name pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Check a name before it is sent.
pub fn validate_name(name: &str) -> Result<(), ClientError> {
    if name.is_empty() {
        return Err(ClientError::EmptyName);
    }
    let pattern = Regex::new(NAME_PATTERN)?;
    if name.len() > MAX_NAME_LEN || !pattern.is_match(name) {
        return Err(ClientError::InvalidName);
    }
    Ok(())
}

/// Final answer after redirects were followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub status: StatusCode,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl Greeting {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

pub struct SayHiClient {
    url: String,
    http: reqwest::Client,
}

impl SayHiClient {
    /// Client for the API at `url` (e.g. `http://127.0.0.1:8080/api`).
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    /// Validate `name` and send it.
    pub async fn say_hi(&self, name: &str) -> Result<Greeting, ClientError> {
        validate_name(name)?;

        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let reply: ReplyBody = serde_json::from_slice(&bytes).unwrap_or_default();

        tracing::debug!(status = %status, "Greeting received");
        Ok(Greeting {
            status,
            message: reply.message,
            error: reply.error,
        })
    }
}
