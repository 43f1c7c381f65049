//! Error types for the prodshot client.

use std::time::Duration;

use thiserror::Error;

/// Error codes the backend may attach to an error body.
pub mod error_code {
    pub const FREE_QUOTA_EXCEEDED: &str = "free_quota_exceeded";
    pub const INSUFFICIENT_CREDITS: &str = "insufficient_credits";
}

/// Phrase the backend puts in `detail` when the free tier is exhausted.
const QUOTA_PHRASE: &str = "limit reached";

/// Result type alias for prodshot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for prodshot client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Local input check failed; no request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// The source image was rejected before or during upload.
    #[error("upload failed: {0}")]
    Upload(String),

    /// API error returned by the backend.
    #[error("prodshot: {detail} (http={http_status})")]
    Api {
        http_status: u16,
        detail: String,
        code: Option<String>,
    },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The backend marked the job as failed.
    #[error("generation failed: {0}")]
    JobFailed(String),

    /// The job did not reach a terminal state within the poll ceiling.
    #[error("generation timed out after {0:?}")]
    PollTimeout(Duration),

    /// The response did not match any known shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A submission is already in progress for this session.
    #[error("a generation is already in progress")]
    Busy,

    /// The session has been closed.
    #[error("session closed")]
    Closed,
}

impl Error {
    /// Creates a new API error.
    pub fn api(http_status: u16, detail: impl Into<String>) -> Self {
        Error::Api {
            http_status,
            detail: detail.into(),
            code: None,
        }
    }

    /// Creates a new API error carrying a structured code.
    pub fn api_with_code(http_status: u16, detail: impl Into<String>, code: impl Into<String>) -> Self {
        Error::Api {
            http_status,
            detail: detail.into(),
            code: Some(code.into()),
        }
    }

    /// Returns true if the free-tier quota of this device is exhausted.
    ///
    /// A structured code wins when the backend sends one; otherwise the
    /// human-readable detail of a 403 is matched.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            Error::Api { code: Some(code), .. } => code == error_code::FREE_QUOTA_EXCEEDED,
            Error::Api {
                http_status: 403,
                detail,
                ..
            } => detail.to_lowercase().contains(QUOTA_PHRASE),
            _ => false,
        }
    }

    /// Returns true if the account has no credits left.
    pub fn is_insufficient_credits(&self) -> bool {
        match self {
            Error::Api { code: Some(code), .. } => code == error_code::INSUFFICIENT_CREDITS,
            Error::Api { detail, .. } => detail.to_lowercase().contains("insufficient credits"),
            _ => false,
        }
    }

    /// Returns true if the credential was missing or rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { http_status: 401, .. })
    }

    /// Returns true if this is a rate limit error.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::Api { http_status: 429, .. })
    }

    /// Returns true if this is a server-side error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { http_status, .. } if *http_status >= 500)
    }

    /// Returns true if the request can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => self.is_rate_limit() || self.is_server_error(),
        }
    }

    /// Returns the message suitable for showing to a user.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { detail, .. } if !detail.is_empty() => detail.clone(),
            Error::Validation(msg) | Error::Upload(msg) | Error::JobFailed(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
