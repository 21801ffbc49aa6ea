use shared::error::ErrorCode;
use thiserror::Error;

/// Failures crossing the engine boundary. None of these reach the host as a
/// panic: query failures become a `Failed` snapshot, the others advisories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("donor query failed: {0}")]
    QueryFailed(String),
    #[error("live updates unavailable: {0}")]
    SubscriptionFailed(String),
    #[error("{capability} unavailable: {detail}")]
    CapabilityUnavailable {
        capability: &'static str,
        detail: String,
    },
}

impl SearchError {
    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::QueryFailed(err.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SearchError::QueryFailed(_) => ErrorCode::Internal,
            SearchError::SubscriptionFailed(_) | SearchError::CapabilityUnavailable { .. } => {
                ErrorCode::Unavailable
            }
        }
    }

    /// Query failures are transient; re-issuing the same predicates may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::QueryFailed(_))
    }
}
