//! GigaBrain - Solana token trading decision engine
//!
//! Screens candidate tokens for manipulation, asks a panel of AI advisors
//! for a consensus with per-provider failover, blends it with deterministic
//! strategies, sizes positions under portfolio-wide risk limits and manages
//! every position through its exit. One independent bot runs per wallet.
//!
//! # Modules
//!
//! - `domain`: Core decision rules (discovery, screening, consensus, risk, lifecycle)
//! - `ports`: Trait abstractions (MarketDataPort, AiProvider, TradeExecutor, EngineStore, KeyVault)
//! - `strategy`: Deterministic strategies (MeanReversion, MomentumBreakout, GridTrading)
//! - `hivemind`: Multi-provider AI consensus with circuit breakers
//! - `adapters`: Reference implementations and the CLI
//! - `config`: Configuration loading and validation
//! - `application`: Per-wallet bots, scheduler and registry

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod hivemind;
pub mod ports;
pub mod strategy;
