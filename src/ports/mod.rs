//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Market data (candidate universe and token metrics)
//! - AI advisors (one uniform trait per provider)
//! - Trade execution (atomic buy/sell)
//! - Persistence (positions, journal, blacklist, strategy config)
//! - Key custody (opaque signer handles)

pub mod ai_provider;
pub mod execution;
pub mod key_vault;
pub mod market_data;
pub mod mocks;
pub mod store;
pub mod strategy;

pub use ai_provider::{AiProvider, ProviderError, ProviderTier};
pub use execution::{BuyFill, ExecutionError, SellFill, TradeExecutor};
pub use key_vault::{KeyVault, KeyVaultError, SignerHandle};
pub use market_data::{MarketDataError, MarketDataPort};
pub use store::{EngineStore, StoreError};
pub use strategy::StrategyPort;
