use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BlacklistEntry, HivemindStrategyConfig, PortfolioSnapshot, Position, TradeJournalEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Persistence collaborator. Every record is scoped by wallet.
#[async_trait]
pub trait EngineStore: Send + Sync {
    async fn upsert_position(&self, position: &Position) -> Result<(), StoreError>;

    async fn open_positions(&self, wallet: &str) -> Result<Vec<Position>, StoreError>;

    async fn append_journal(&self, entry: &TradeJournalEntry) -> Result<(), StoreError>;

    /// Most recent `limit` entries, oldest first
    async fn recent_journal(&self, wallet: &str, limit: usize) -> Result<Vec<TradeJournalEntry>, StoreError>;

    async fn add_blacklist(&self, wallet: &str, entry: &BlacklistEntry) -> Result<(), StoreError>;

    /// Returns whether an entry was removed
    async fn remove_blacklist(&self, wallet: &str, mint: &str) -> Result<bool, StoreError>;

    async fn blacklist(&self, wallet: &str) -> Result<Vec<BlacklistEntry>, StoreError>;

    async fn save_strategy_config(&self, wallet: &str, config: &HivemindStrategyConfig) -> Result<(), StoreError>;

    async fn strategy_config(&self, wallet: &str) -> Result<Option<HivemindStrategyConfig>, StoreError>;

    async fn save_portfolio(&self, wallet: &str, snapshot: &PortfolioSnapshot) -> Result<(), StoreError>;

    async fn portfolio(&self, wallet: &str) -> Result<Option<PortfolioSnapshot>, StoreError>;
}
