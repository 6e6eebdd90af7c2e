//! Errors returned by synthesis providers.

/// Failure of one provider call.
///
/// Kept structured so classification happens once (`retry::classify`) and
/// nothing downstream re-parses message text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Credential missing or rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Account has no credits left (HTTP 402).
    #[error("quota exhausted: {0}")]
    Quota(String),

    /// HTTP 429.
    #[error("rate limited")]
    RateLimited,

    /// Any other non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u32, message: String },

    /// Transport failure (DNS, connect, reset, timeout).
    #[error("network: {0}")]
    Network(String),

    /// Call succeeded but the response carried no image.
    #[error("response contained no image data")]
    MissingImage,

    /// Body could not be parsed or decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<curl::Error> for ProviderError {
    fn from(e: curl::Error) -> Self {
        ProviderError::Network(e.to_string())
    }
}

impl ProviderError {
    /// Map a non-2xx HTTP status to the matching variant.
    pub fn from_status(status: u32, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => ProviderError::Auth(message),
            402 => ProviderError::Quota(message),
            429 => ProviderError::RateLimited,
            _ => ProviderError::Http { status, message },
        }
    }
}
