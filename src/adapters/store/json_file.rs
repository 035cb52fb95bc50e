//! JSON file store
//!
//! One directory per wallet under the data root:
//!
//! ```text
//! <root>/<wallet>/positions.json
//! <root>/<wallet>/journal.json
//! <root>/<wallet>/blacklist.json
//! <root>/<wallet>/strategy_config.json
//! <root>/<wallet>/portfolio.json
//! ```
//!
//! Files are rewritten whole through a temp file and rename.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::{BlacklistEntry, HivemindStrategyConfig, PortfolioSnapshot, Position, TradeJournalEntry};
use crate::ports::{EngineStore, StoreError};

const POSITIONS_FILE: &str = "positions.json";
const JOURNAL_FILE: &str = "journal.json";
const BLACKLIST_FILE: &str = "blacklist.json";
const STRATEGY_CONFIG_FILE: &str = "strategy_config.json";
const PORTFOLIO_FILE: &str = "portfolio.json";

pub struct JsonFileStore {
    root: PathBuf,
    /// Serialises read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, wallet: &str, file: &str) -> PathBuf {
        self.root.join(wallet).join(file)
    }

    async fn load<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Ok(T::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(value)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl EngineStore for JsonFileStore {
    async fn upsert_position(&self, position: &Position) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path(&position.owner_wallet, POSITIONS_FILE);
        let mut positions: HashMap<String, Position> = self.load(&path).await?;

        if position.is_open()
            && positions
                .values()
                .any(|p| p.is_open() && p.token_mint == position.token_mint && p.id != position.id)
        {
            return Err(StoreError::Conflict(format!(
                "open position already exists for {}",
                position.token_mint
            )));
        }

        positions.insert(position.id.clone(), position.clone());
        self.save(&path, &positions).await
    }

    async fn open_positions(&self, wallet: &str) -> Result<Vec<Position>, StoreError> {
        let positions: HashMap<String, Position> = self.load(&self.path(wallet, POSITIONS_FILE)).await?;
        Ok(positions.into_values().filter(|p| p.is_open()).collect())
    }

    async fn append_journal(&self, entry: &TradeJournalEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path(&entry.owner_wallet, JOURNAL_FILE);
        let mut journal: Vec<TradeJournalEntry> = self.load(&path).await?;
        if journal.iter().any(|e| e.position_id == entry.position_id) {
            return Err(StoreError::Conflict(format!("journal entry exists for {}", entry.position_id)));
        }
        journal.push(entry.clone());
        self.save(&path, &journal).await
    }

    async fn recent_journal(&self, wallet: &str, limit: usize) -> Result<Vec<TradeJournalEntry>, StoreError> {
        let journal: Vec<TradeJournalEntry> = self.load(&self.path(wallet, JOURNAL_FILE)).await?;
        let skip = journal.len().saturating_sub(limit);
        Ok(journal.into_iter().skip(skip).collect())
    }

    async fn add_blacklist(&self, wallet: &str, entry: &BlacklistEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path(wallet, BLACKLIST_FILE);
        let mut entries: Vec<BlacklistEntry> = self.load(&path).await?;
        if entries.iter().any(|e| e.token_mint == entry.token_mint) {
            return Ok(());
        }
        entries.push(entry.clone());
        self.save(&path, &entries).await
    }

    async fn remove_blacklist(&self, wallet: &str, mint: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path(wallet, BLACKLIST_FILE);
        let mut entries: Vec<BlacklistEntry> = self.load(&path).await?;
        let before = entries.len();
        entries.retain(|e| e.token_mint != mint);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&path, &entries).await?;
        Ok(true)
    }

    async fn blacklist(&self, wallet: &str) -> Result<Vec<BlacklistEntry>, StoreError> {
        self.load(&self.path(wallet, BLACKLIST_FILE)).await
    }

    async fn save_strategy_config(&self, wallet: &str, config: &HivemindStrategyConfig) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.save(&self.path(wallet, STRATEGY_CONFIG_FILE), config).await
    }

    async fn strategy_config(&self, wallet: &str) -> Result<Option<HivemindStrategyConfig>, StoreError> {
        self.load(&self.path(wallet, STRATEGY_CONFIG_FILE)).await
    }

    async fn save_portfolio(&self, wallet: &str, snapshot: &PortfolioSnapshot) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.save(&self.path(wallet, PORTFOLIO_FILE), snapshot).await
    }

    async fn portfolio(&self, wallet: &str) -> Result<Option<PortfolioSnapshot>, StoreError> {
        self.load(&self.path(wallet, PORTFOLIO_FILE)).await
    }
}
