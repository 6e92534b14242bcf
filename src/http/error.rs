//! Uniform failure values produced by every request primitive.

use reqwest::StatusCode;
use serde_json::{Value, json};

/// Message reported for a 401 on an authenticated write.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Check your API credentials.";

/// Message reported for a 403 on an authenticated write.
pub const FORBIDDEN_MESSAGE: &str =
    "Forbidden: You do not have permission to access this resource.";

/// A failed request, classified by kind.
///
/// Variants render through `Display` as the exact text callers see in the
/// `"error"` field of [`RequestError::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// Non-2xx status. `summary` is the status line plus URL, `message` the
    /// remote `message` field when the error body was JSON.
    Http {
        status: u16,
        summary: String,
        message: Option<String>,
    },
    /// HTTP 401 on an authenticated write operation.
    Unauthorized,
    /// HTTP 403 on an authenticated write operation.
    Forbidden,
    /// The transport gave up waiting for the server.
    Timeout,
    /// Connection, DNS, TLS or other transport failure.
    Transport(String),
    /// Anything else, including a body that failed to decode.
    Unexpected(String),
    /// Every attempt allowed by the retry policy failed.
    RetriesExhausted {
        attempts: usize,
        last: Box<RequestError>,
    },
}

impl RequestError {
    /// Builds an HTTP error from a status, the request URL and the raw error body.
    pub fn http(status: StatusCode, url: &str, body: &[u8]) -> Self {
        let summary = match status.canonical_reason() {
            Some(reason) => format!("{} {} for url: {}", status.as_u16(), reason, url),
            None => format!("{} for url: {}", status.as_u16(), url),
        };
        RequestError::Http {
            status: status.as_u16(),
            summary,
            message: extract_message(body),
        }
    }

    /// The HTTP status behind this failure, if any.
    ///
    /// For [`RequestError::RetriesExhausted`] this is the status of the last attempt.
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            RequestError::Unauthorized => Some(401),
            RequestError::Forbidden => Some(403),
            RequestError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// The `message` field supplied by the remote service.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            RequestError::Http { message, .. } => message.as_deref(),
            RequestError::RetriesExhausted { last, .. } => last.remote_message(),
            _ => None,
        }
    }

    /// Renders the failure as `{"error": ..., "message": ...}`.
    pub fn to_json(&self) -> Value {
        match self {
            RequestError::Http { message, .. } => json!({
                "error": self.to_string(),
                "message": message,
            }),
            _ => json!({ "error": self.to_string() }),
        }
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::Http { summary, .. } => write!(f, "HTTP error occurred: {}", summary),
            RequestError::Unauthorized => f.write_str(UNAUTHORIZED_MESSAGE),
            RequestError::Forbidden => f.write_str(FORBIDDEN_MESSAGE),
            RequestError::Timeout => f.write_str("Request timed out."),
            RequestError::Transport(detail) => {
                write!(f, "Request exception occurred: {}", detail)
            }
            RequestError::Unexpected(detail) => {
                write!(f, "An unexpected error occurred: {}", detail)
            }
            RequestError::RetriesExhausted { .. } => f.write_str("Max retries exceeded"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::RetriesExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

/// Finds the [`RequestError`] inside an `anyhow` chain and returns its status.
pub fn status_of(error: &anyhow::Error) -> Option<u16> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RequestError>())
        .and_then(RequestError::status)
}

fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("message")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
