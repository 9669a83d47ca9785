//! Error taxonomy for the Streamlabs session client.
//!
//! Errors are classified into three operational families (transport, HTTP status, malformed
//! response) plus two caller-side conditions. Only the operational families ever reach the
//! retry loop, and only some of their members are worth retrying.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of response-body bytes kept for diagnostics.
const ERROR_BODY_SNIPPET_LEN: usize = 220;

/// HTTP statuses that indicate a transient server-side condition.
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("build HTTP client")]
    Build(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// DNS, connection, TLS or timeout failure, or a failure while reading the body.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Streamlabs API returned status {status}: {body}")]
    HttpStatus {
        status: StatusCode,
        body: String,
        /// Delay requested by the server through `Retry-After`, if any.
        retry_after: Option<std::time::Duration>,
    },

    /// The body was not the JSON shape the endpoint documents.
    #[error("malformed response ({source}): {body}")]
    MalformedResponse {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// `end` was called before any stream was started on this client.
    #[error("no stream has been started on this session")]
    NoActiveStream,
}

impl ClientError {
    /// Whether an idempotent request that failed with this error may be re-sent.
    ///
    /// Transport errors are retried only when they are connect failures or timeouts. Statuses
    /// are retried only when listed in [`RETRYABLE_STATUSES`].
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_connect() || err.is_timeout(),
            Self::HttpStatus { status, .. } => RETRYABLE_STATUSES.contains(status),
            Self::Build(_) | Self::MalformedResponse { .. } | Self::NoActiveStream => false,
        }
    }

    /// Server-requested delay before the next attempt.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Self::HttpStatus { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// The HTTP status, when the failure came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Trims and truncates a response body so it fits on one log line.
pub(crate) fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut end = ERROR_BODY_SNIPPET_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
