//! Builds bots from a validated config using the reference adapters

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::adapters::ai::OpenAiCompatibleProvider;
use crate::adapters::execution::PaperExecutor;
use crate::adapters::key_vault::{EnvKeyVault, DEFAULT_ENV_PREFIX};
use crate::adapters::market_data::{SnapshotMarketData, SnapshotSource};
use crate::adapters::store::{JsonFileStore, MemoryStore};
use crate::application::{event_channel, BotDeps, BotSettings, EngineEvent, WalletBot};
use crate::config::Config;
use crate::hivemind::Hivemind;
use crate::ports::{AiProvider, EngineStore, KeyVault, MarketDataPort};
use crate::strategy::StrategyEvaluator;

/// Collaborators shared by every bot of one process
pub struct Services {
    config: Config,
    market: Arc<dyn MarketDataPort>,
    providers: Vec<Arc<dyn AiProvider>>,
    store: Arc<dyn EngineStore>,
    evaluator: Arc<StrategyEvaluator>,
    vault: EnvKeyVault,
    events: broadcast::Sender<EngineEvent>,
}

impl Services {
    pub fn from_config(config: Config) -> Result<Self> {
        let http_timeout = Duration::from_secs(config.data.http_timeout_secs);
        let snapshot = config.data.snapshot_location()?;
        let market = SnapshotMarketData::new(SnapshotSource::parse(&snapshot), http_timeout)
            .context("Failed to create market data client")?
            .with_strict_mints(config.data.strict_mints);

        let call_timeout = Duration::from_millis(config.hivemind.engine.call_timeout_ms);
        let mut providers: Vec<Arc<dyn AiProvider>> = Vec::new();
        for settings in config.hivemind.providers.iter().filter(|p| p.enabled) {
            let api_key = settings
                .api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|k| !k.is_empty());
            if settings.api_key_env.is_some() && api_key.is_none() {
                tracing::warn!("Provider {} has no API key in the environment", settings.id);
            }
            let provider = OpenAiCompatibleProvider::new(settings.clone(), api_key, call_timeout)
                .with_context(|| format!("Failed to create provider {}", settings.id))?;
            providers.push(Arc::new(provider));
        }
        if providers.is_empty() {
            tracing::warn!("No AI providers enabled, trading on strategy signals only");
        }

        let store: Arc<dyn EngineStore> = match config.data.store_path()? {
            Some(root) => {
                tracing::info!("Store: {}", root.display());
                Arc::new(JsonFileStore::new(root))
            }
            None => {
                tracing::warn!("No store_dir configured, state is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let vault = EnvKeyVault::new(
            config
                .engine
                .key_env_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string()),
        );
        let (events, _) = event_channel();

        Ok(Self {
            evaluator: Arc::new(StrategyEvaluator::new(&config.strategies)),
            market: Arc::new(market),
            providers,
            store,
            vault,
            events,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Restore the bot for `wallet`. The wallet must have a key in the vault.
    pub async fn bot(&self, wallet: &str) -> Result<Arc<WalletBot>> {
        let signer = self
            .vault
            .signer(wallet)
            .with_context(|| format!("No signer for wallet {} (set {})", wallet, self.vault.env_var(wallet)))?;
        let executor = PaperExecutor::new(
            self.market.clone(),
            signer,
            self.config.execution.paper_base_slippage_bps,
        );

        let deps = BotDeps {
            market: self.market.clone(),
            hivemind: Arc::new(Hivemind::new(self.config.hivemind.engine.clone(), self.providers.clone())),
            executor: Arc::new(executor),
            store: self.store.clone(),
            evaluator: self.evaluator.clone(),
            events: self.events.clone(),
        };
        let bot = WalletBot::load(
            wallet,
            deps,
            BotSettings::from_config(&self.config),
            self.config.baseline_strategy(Utc::now()),
        )
        .await
        .with_context(|| format!("Failed to load bot for {}", wallet))?;
        Ok(Arc::new(bot))
    }
}
