//! Adapters Layer - Reference implementations of the ports
//!
//! - AI: OpenAI-compatible chat-completions providers
//! - Market Data: JSON snapshot source (file or URL)
//! - Execution: paper trade executor
//! - Store: in-memory and JSON-file persistence
//! - Key Vault: environment-backed signer handles
//! - CLI: command-line interface and wiring

pub mod ai;
pub mod cli;
pub mod execution;
pub mod key_vault;
pub mod market_data;
pub mod store;

pub use cli::CliApp;
