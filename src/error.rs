use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Collaborator not configured: {0}")]
    Unconfigured(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl TrackerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn unconfigured(msg: impl Into<String>) -> Self {
        Self::Unconfigured(msg.into())
    }

    /// Missing credentials are expected in partial deployments and are not
    /// reported as failures.
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::Unconfigured(_))
    }

    /// Maps an HTTP status to the error taxonomy shared by every collaborator.
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let message = body.into();
        match status.as_u16() {
            429 => Self::RateLimited(message),
            401 | 403 => Self::Unauthorized(message),
            code => Self::Api { status: code, message },
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Returns the response unchanged when it succeeded, otherwise drains the body
/// into a [`TrackerError`].
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TrackerError::from_status(status, body))
}

/// Checks the status and decodes the body. Undecodable payloads are
/// [`TrackerError::MalformedResponse`], not transport errors.
pub async fn json_body<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let body = check_status(response).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}
