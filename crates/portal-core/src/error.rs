use thiserror::Error;

/// Errors surfaced by the notification API client.
///
/// List readers never see `Transport`/`Server` directly — the service layer
/// degrades those to the fallback dataset. `Cancelled` is the one variant
/// that crosses the service boundary, so callers can tell a superseded
/// request apart from a real failure.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, broken body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered but reported failure.
    #[error("server error: {0}")]
    Server(String),

    /// Response arrived but could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The request was superseded by a newer one for the same logical slot.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// True when this error is the expected outcome of request de-duplication
    /// and should be swallowed silently.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
