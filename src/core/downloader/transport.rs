use async_trait::async_trait;

use crate::core::error::{StageError, StageResult};

/// Fetches the bytes behind a URL.
///
/// Implementations map a missing resource to `StageError::NotFound`,
/// connection failures, timeouts and 5xx/429 answers to
/// `StageError::NetworkUnavailable`, and any other non-success status to
/// `StageError::DownloadFailed`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> StageResult<Vec<u8>>;

    /// Whether `url` is served, without keeping the body.
    async fn exists(&self, url: &str) -> StageResult<bool> {
        match self.get(url).await {
            Ok(_) => Ok(true),
            Err(StageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
