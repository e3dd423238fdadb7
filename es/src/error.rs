//! Store error types

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while talking to an entry store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store not configured: {0}")]
    NotConfigured(String),

    #[error("Store API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Entry {0} already exists")]
    Duplicate(Uuid),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if the failure might succeed when attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::ApiError { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            StoreError::Network(_) => true,
            StoreError::Unavailable(_) => true,
            StoreError::NotConfigured(_) => false,
            StoreError::Duplicate(_) => false,
            StoreError::InvalidRequest(_) => false,
            StoreError::InvalidResponse(_) => false,
            StoreError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            StoreError::ApiError {
                status: 503,
                message: "Service unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            StoreError::ApiError {
                status: 429,
                message: "Too many requests".to_string()
            }
            .is_retryable()
        );
        assert!(
            !StoreError::ApiError {
                status: 409,
                message: "duplicate key value violates unique constraint".to_string()
            }
            .is_retryable()
        );
        assert!(StoreError::Unavailable("down".to_string()).is_retryable());
        assert!(!StoreError::Duplicate(Uuid::nil()).is_retryable());
        assert!(!StoreError::NotConfigured("SUPABASE_URL".to_string()).is_retryable());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = StoreError::ApiError {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert_eq!(err.to_string(), "Store API error 401: Invalid API key");
    }
}
