use thiserror::Error;

/// Failures of a single upstream fetch.
///
/// `Clone` because one in-flight fetch result is handed to every caller
/// that was coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("news provider is unreachable")]
    NetworkUnavailable,

    #[error("news provider did not respond in time")]
    Timeout,

    #[error("news provider returned HTTP {0}")]
    UpstreamError(u16),

    #[error("news provider sent a response that could not be understood")]
    MalformedResponse,
}

impl FetchError {
    /// Whether a retry has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkUnavailable | FetchError::Timeout => true,
            FetchError::UpstreamError(status) => *status == 429 || *status >= 500,
            FetchError::MalformedResponse => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::UpstreamError(status.as_u16())
        } else if err.is_decode() || err.is_body() {
            FetchError::MalformedResponse
        } else {
            FetchError::NetworkUnavailable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(FetchError::NetworkUnavailable.is_transient());
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::UpstreamError(503).is_transient());
        assert!(FetchError::UpstreamError(429).is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!FetchError::MalformedResponse.is_transient());
        assert!(!FetchError::UpstreamError(401).is_transient());
        assert!(!FetchError::UpstreamError(404).is_transient());
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        assert_eq!(
            FetchError::UpstreamError(403).to_string(),
            "news provider returned HTTP 403"
        );
        assert_eq!(
            CategoryError::UnknownCategory("cooking".to_string()).to_string(),
            "unknown category: cooking"
        );
    }
}
