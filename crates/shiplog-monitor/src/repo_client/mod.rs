pub mod github;
pub mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shiplog_core::notification::FailureKind;
use shiplog_core::ChangeRequestSummary;
use thiserror::Error;

pub use github::GitHubClient;
pub use mock::MockRepositoryClient;

/// Failure of one hosting-service query. None of these are retried here;
/// the monitor tries again on its next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid repository request: {0}")]
    InvalidInput(String),

    #[error("authorization failed: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidInput(_) => FailureKind::InvalidInput,
            FetchError::Unauthorized(_) => FailureKind::Unauthorized,
            FetchError::RateLimited(_) | FetchError::Transient(_) => FailureKind::Transient,
            FetchError::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }

    /// Safe to try again later without changing anything.
    pub fn is_transient(&self) -> bool {
        self.kind() == FailureKind::Transient
    }
}

#[async_trait]
pub trait RepositoryClient: Send + Sync {
    fn name(&self) -> &str;

    /// Change requests of `owner/name` merged at or after `since` (all of
    /// them when `since` is `None`), newest merge first.
    async fn fetch_merged_since(
        &self,
        owner: &str,
        name: &str,
        credential: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ChangeRequestSummary>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_counts_as_transient() {
        assert!(FetchError::RateLimited("slow down".into()).is_transient());
        assert!(FetchError::Transient("timeout".into()).is_transient());
        assert!(!FetchError::Unauthorized("bad token".into()).is_transient());
        assert_eq!(
            FetchError::MalformedResponse("eof".into()).kind(),
            FailureKind::MalformedResponse
        );
    }
}
