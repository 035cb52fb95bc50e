use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::{BlacklistEntry, HivemindStrategyConfig, PortfolioSnapshot, Position, TradeJournalEntry};
use crate::ports::{EngineStore, StoreError};

/// Everything stored for one wallet
#[derive(Debug, Clone, Default)]
pub(super) struct WalletRecords {
    pub positions: HashMap<String, Position>,
    pub journal: Vec<TradeJournalEntry>,
    pub blacklist: HashMap<String, BlacklistEntry>,
    pub strategy_config: Option<HivemindStrategyConfig>,
    pub portfolio: Option<PortfolioSnapshot>,
}

/// Volatile store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    wallets: RwLock<HashMap<String, WalletRecords>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every journal entry for `wallet`, oldest first
    pub async fn journal(&self, wallet: &str) -> Vec<TradeJournalEntry> {
        self.wallets
            .read()
            .await
            .get(wallet)
            .map(|r| r.journal.clone())
            .unwrap_or_default()
    }

    pub async fn all_positions(&self, wallet: &str) -> Vec<Position> {
        self.wallets
            .read()
            .await
            .get(wallet)
            .map(|r| r.positions.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn upsert_position(&self, position: &Position) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write().await;
        let records = wallets.entry(position.owner_wallet.clone()).or_default();
        if position.is_open() {
            let clash = records
                .positions
                .values()
                .any(|p| p.is_open() && p.token_mint == position.token_mint && p.id != position.id);
            if clash {
                return Err(StoreError::Conflict(format!(
                    "open position already exists for {}",
                    position.token_mint
                )));
            }
        }
        records.positions.insert(position.id.clone(), position.clone());
        Ok(())
    }

    async fn open_positions(&self, wallet: &str) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .wallets
            .read()
            .await
            .get(wallet)
            .map(|r| r.positions.values().filter(|p| p.is_open()).cloned().collect())
            .unwrap_or_default())
    }

    async fn append_journal(&self, entry: &TradeJournalEntry) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write().await;
        let records = wallets.entry(entry.owner_wallet.clone()).or_default();
        if records.journal.iter().any(|e| e.position_id == entry.position_id) {
            return Err(StoreError::Conflict(format!("journal entry exists for {}", entry.position_id)));
        }
        records.journal.push(entry.clone());
        Ok(())
    }

    async fn recent_journal(&self, wallet: &str, limit: usize) -> Result<Vec<TradeJournalEntry>, StoreError> {
        let journal = self.journal(wallet).await;
        let skip = journal.len().saturating_sub(limit);
        Ok(journal.into_iter().skip(skip).collect())
    }

    async fn add_blacklist(&self, wallet: &str, entry: &BlacklistEntry) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write().await;
        wallets
            .entry(wallet.to_string())
            .or_default()
            .blacklist
            .entry(entry.token_mint.clone())
            .or_insert_with(|| entry.clone());
        Ok(())
    }

    async fn remove_blacklist(&self, wallet: &str, mint: &str) -> Result<bool, StoreError> {
        let mut wallets = self.wallets.write().await;
        Ok(wallets
            .get_mut(wallet)
            .map(|r| r.blacklist.remove(mint).is_some())
            .unwrap_or(false))
    }

    async fn blacklist(&self, wallet: &str) -> Result<Vec<BlacklistEntry>, StoreError> {
        Ok(self
            .wallets
            .read()
            .await
            .get(wallet)
            .map(|r| r.blacklist.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_strategy_config(&self, wallet: &str, config: &HivemindStrategyConfig) -> Result<(), StoreError> {
        self.wallets
            .write()
            .await
            .entry(wallet.to_string())
            .or_default()
            .strategy_config = Some(config.clone());
        Ok(())
    }

    async fn strategy_config(&self, wallet: &str) -> Result<Option<HivemindStrategyConfig>, StoreError> {
        Ok(self
            .wallets
            .read()
            .await
            .get(wallet)
            .and_then(|r| r.strategy_config.clone()))
    }

    async fn save_portfolio(&self, wallet: &str, snapshot: &PortfolioSnapshot) -> Result<(), StoreError> {
        self.wallets
            .write()
            .await
            .entry(wallet.to_string())
            .or_default()
            .portfolio = Some(snapshot.clone());
        Ok(())
    }

    async fn portfolio(&self, wallet: &str) -> Result<Option<PortfolioSnapshot>, StoreError> {
        Ok(self.wallets.read().await.get(wallet).and_then(|r| r.portfolio.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, OpenRequest, PositionMode, Severity, StrategyId};
    use chrono::Utc;

    fn position(mint: &str) -> Position {
        Position::open(
            OpenRequest {
                owner_wallet: "w".into(),
                token_mint: mint.into(),
                symbol: "T".into(),
                entry_price_sol: 1.0,
                amount_sol: 1.0,
                token_amount: 1.0,
                strategy: StrategyId::GridTrading,
                confidence_at_entry: 0.6,
                profit_target_pct: 3.0,
                stop_loss_pct: 6.0,
                mode: PositionMode::Scalp,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_positions_lifecycle() {
        let store = MemoryStore::new();
        let mut p = position("m1");
        store.upsert_position(&p).await.unwrap();
        assert_eq!(store.open_positions("w").await.unwrap().len(), 1);

        let mut dup = position("m1");
        dup.id = "other".into();
        assert!(matches!(store.upsert_position(&dup).await, Err(StoreError::Conflict(_))));

        p.close(Utc::now()).unwrap();
        store.upsert_position(&p).await.unwrap();
        assert!(store.open_positions("w").await.unwrap().is_empty());
        assert_eq!(store.all_positions("w").await.len(), 1);
    }

    #[tokio::test]
    async fn test_journal_single_entry_per_position() {
        let store = MemoryStore::new();
        let p = position("m1");
        let entry = TradeJournalEntry::from_close(&p, 1.1, ExitReason::ProfitTarget, Utc::now());
        store.append_journal(&entry).await.unwrap();
        assert!(store.append_journal(&entry).await.is_err());
        assert_eq!(store.recent_journal("w", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_portfolio_snapshot_per_wallet() {
        let store = MemoryStore::new();
        assert!(store.portfolio("w").await.unwrap().is_none());
        let snapshot = PortfolioSnapshot {
            cash_sol: 7.5,
            peak_value_sol: 10.0,
            drawdown_paused: true,
            trades_today: 2,
            trading_day: None,
            saved_at: Utc::now(),
        };
        store.save_portfolio("w", &snapshot).await.unwrap();
        assert_eq!(store.portfolio("w").await.unwrap(), Some(snapshot));
        assert!(store.portfolio("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blacklist_roundtrip() {
        let store = MemoryStore::new();
        let entry = BlacklistEntry::system("m1", "bundle".into(), Severity::Critical, Utc::now());
        store.add_blacklist("w", &entry).await.unwrap();
        assert_eq!(store.blacklist("w").await.unwrap().len(), 1);
        assert!(store.remove_blacklist("w", "m1").await.unwrap());
        assert!(!store.remove_blacklist("w", "m1").await.unwrap());
    }
}
