use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TokenCandidate;

/// Market data error type
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("REST API error: {0}")]
    RestError(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),

    #[error("Snapshot unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out")]
    Timeout,
}

/// Source of candidate tokens and their current metrics
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Current candidate universe
    async fn list_candidates(&self) -> Result<Vec<TokenCandidate>, MarketDataError>;

    /// Fresh metrics for a single mint, if the source still lists it
    async fn get_token(&self, mint: &str) -> Result<Option<TokenCandidate>, MarketDataError> {
        Ok(self
            .list_candidates()
            .await?
            .into_iter()
            .find(|t| t.mint == mint))
    }
}
