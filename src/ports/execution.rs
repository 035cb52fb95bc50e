use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("API request failed: {0}")]
    ApiError(String),
    #[error("Transaction signing failed: {0}")]
    SigningError(String),
    #[error("Transaction execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Slippage tolerance exceeded")]
    SlippageExceeded,
    #[error("Insufficient funds: need {needed:.4} SOL, have {available:.4} SOL")]
    InsufficientFunds { needed: f64, available: f64 },
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyFill {
    pub signature: String,
    pub tokens_received: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellFill {
    pub signature: String,
    pub sol_received: f64,
}

/// Swap executor. Each call is atomic: it either fills or changes nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn buy(&self, mint: &str, amount_sol: f64, slippage_bps: u16) -> Result<BuyFill, ExecutionError>;

    async fn sell(&self, mint: &str, token_amount: f64, slippage_bps: u16) -> Result<SellFill, ExecutionError>;
}
