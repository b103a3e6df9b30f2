//! Provider and roster error types

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the request executor once its own retries are spent,
/// or immediately for terminal responses.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No response was obtained (timeout, connection failure)
    #[error("transport error: {0}")]
    Transport(String),

    /// Response obtained with a status in the retriable set
    #[error("retriable provider error (status {status:?}): {detail}")]
    Retriable { status: Option<u16>, detail: String },

    /// Response obtained with a status outside the retriable set
    #[error("terminal provider error {status}: {detail}")]
    Terminal { status: u16, detail: String },

    /// The provider signalled quota exhaustion; traffic is paused
    #[error("provider quota exhausted, paused for {retry_after:?}")]
    QuotaExhausted { retry_after: Duration },

    /// The provider answered but the payload could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Check if this error is retryable by an outer retry loop
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Retriable { .. } => true,
            ProviderError::QuotaExhausted { .. } => true,
            ProviderError::Terminal { .. } => false,
            ProviderError::InvalidResponse(_) => false,
        }
    }

    /// Get the pause duration if this is a quota error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::QuotaExhausted { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// The roster collaborator failed after its own bounded retries
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(ProviderError::Transport("connection reset".to_string()).is_retryable());

        assert!(
            ProviderError::Retriable {
                status: Some(503),
                detail: "unavailable".to_string()
            }
            .is_retryable()
        );

        assert!(
            ProviderError::QuotaExhausted {
                retry_after: Duration::from_secs(900)
            }
            .is_retryable()
        );

        assert!(
            !ProviderError::Terminal {
                status: 401,
                detail: "bad token".to_string()
            }
            .is_retryable()
        );

        assert!(!ProviderError::InvalidResponse("not json".to_string()).is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = ProviderError::QuotaExhausted {
            retry_after: Duration::from_secs(42),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(42)));

        let err = ProviderError::Transport("timeout".to_string());
        assert_eq!(err.retry_after(), None);
    }
}
