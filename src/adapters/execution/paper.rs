//! Paper Trade Executor
//!
//! Simulated fills at the current market price with random adverse
//! slippage up to the requested tolerance. Tracks simulated token holdings
//! so sells cannot exceed what was bought.

use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::ports::{BuyFill, ExecutionError, MarketDataPort, SellFill, SignerHandle, TradeExecutor};

pub struct PaperExecutor {
    market: Arc<dyn MarketDataPort>,
    signer: SignerHandle,
    /// Minimum slippage applied to every fill
    base_slippage_bps: u16,
    holdings: Mutex<HashMap<String, f64>>,
}

impl PaperExecutor {
    pub fn new(market: Arc<dyn MarketDataPort>, signer: SignerHandle, base_slippage_bps: u16) -> Self {
        Self {
            market,
            signer,
            base_slippage_bps,
            holdings: Mutex::new(HashMap::new()),
        }
    }

    pub async fn holding(&self, mint: &str) -> f64 {
        self.holdings.lock().await.get(mint).copied().unwrap_or(0.0)
    }

    async fn price(&self, mint: &str) -> Result<f64, ExecutionError> {
        self.market
            .get_token(mint)
            .await
            .map_err(|e| ExecutionError::ApiError(e.to_string()))?
            .and_then(|t| t.current_price_sol())
            .ok_or_else(|| ExecutionError::ExecutionFailed(format!("no price for {}", mint)))
    }

    /// Adverse slippage fraction in [base, max(base, tolerance)]
    fn slippage(&self, tolerance_bps: u16) -> f64 {
        let base = self.base_slippage_bps;
        let bps = rand::thread_rng().gen_range(base..=tolerance_bps.max(base));
        bps as f64 / 10_000.0
    }

    fn signature() -> String {
        let bytes: [u8; 32] = rand::thread_rng().gen();
        format!("paper-{}", bs58::encode(bytes).into_string())
    }
}

#[async_trait]
impl TradeExecutor for PaperExecutor {
    async fn buy(&self, mint: &str, amount_sol: f64, slippage_bps: u16) -> Result<BuyFill, ExecutionError> {
        if !(amount_sol > 0.0) {
            return Err(ExecutionError::InvalidParameters(format!("amount {}", amount_sol)));
        }
        let price = self.price(mint).await?;
        let effective = price * (1.0 + self.slippage(slippage_bps));
        let tokens_received = amount_sol / effective;

        *self.holdings.lock().await.entry(mint.to_string()).or_insert(0.0) += tokens_received;

        tracing::info!(
            "[PAPER] {} BUY {} {:.4} SOL @ {:.10} -> {:.4} tokens",
            self.signer.wallet(),
            mint,
            amount_sol,
            effective,
            tokens_received
        );
        Ok(BuyFill {
            signature: Self::signature(),
            tokens_received,
        })
    }

    async fn sell(&self, mint: &str, token_amount: f64, slippage_bps: u16) -> Result<SellFill, ExecutionError> {
        if !(token_amount > 0.0) {
            return Err(ExecutionError::InvalidParameters(format!("token amount {}", token_amount)));
        }
        let price = self.price(mint).await?;

        let mut holdings = self.holdings.lock().await;
        let held = holdings.get(mint).copied().unwrap_or(0.0);
        // tolerate float dust from the buy side
        if token_amount > held * (1.0 + 1e-9) {
            return Err(ExecutionError::InsufficientFunds {
                needed: token_amount,
                available: held,
            });
        }

        let effective = price * (1.0 - self.slippage(slippage_bps));
        let sol_received = token_amount * effective;
        let remaining = held - token_amount;
        if remaining <= held * 1e-9 {
            holdings.remove(mint);
        } else {
            holdings.insert(mint.to_string(), remaining);
        }

        tracing::info!(
            "[PAPER] {} SELL {} {:.4} tokens @ {:.10} -> {:.4} SOL",
            self.signer.wallet(),
            mint,
            token_amount,
            effective,
            sol_received
        );
        Ok(SellFill {
            signature: Self::signature(),
            sol_received,
        })
    }
}
