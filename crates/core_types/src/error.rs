use serde_json::Value;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a single request against the backend or the storage collaborator.
///
/// `Display` is the message shown to the user, so `Rejected` renders the
/// server's `detail` verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("Authentication required")]
    MissingCredential,
}

impl ApiError {
    /// Builds a `Rejected` error from a non-2xx response body.
    ///
    /// The body is expected to look like `{"detail": "..."}`. Structured
    /// details (validation error lists) are rendered as compact JSON, and a
    /// body without a usable detail falls back to the status code.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("detail").cloned())
            .and_then(|detail| match detail {
                Value::Null => None,
                Value::String(text) if text.trim().is_empty() => None,
                Value::String(text) => Some(text),
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));
        Self::Rejected { status, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
