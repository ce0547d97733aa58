//! Transport error types.

/// Errors produced while talking to the upload service.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl TransportError {
    /// Returns `true` if the service answered with `code`.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Status { status, .. } if *status == code)
    }

    /// Status code sent by the service, if the exchange got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
