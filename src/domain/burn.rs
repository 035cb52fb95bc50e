//! Profit burn planning.
//!
//! A share of realised profit is earmarked for burning. Only the intent is
//! produced here; executing the burn is left to whoever consumes the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::journal::TradeJournalEntry;

pub const MAX_BURN_PERCENTAGE_BPS: u16 = 10_000;

#[derive(Debug, Error, PartialEq)]
pub enum BurnPolicyError {
    #[error("Invalid burn percentage: must be 0-10000 bps, got {0}")]
    InvalidBurnPercentage(u16),
    #[error("Minimum burn amount must be non-negative, got {0}")]
    InvalidMinBurn(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnPolicy {
    pub enabled: bool,
    /// Profit relative to entry value, in basis points, needed to trigger a burn
    pub profit_threshold_bps: u32,
    /// Share of profit to burn, in basis points
    pub burn_percentage_bps: u16,
    pub min_burn_amount_sol: f64,
}

impl Default for BurnPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            profit_threshold_bps: 1_000,
            burn_percentage_bps: 500,
            min_burn_amount_sol: 0.001,
        }
    }
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct BurnPolicyUpdate {
    pub enabled: Option<bool>,
    pub profit_threshold_bps: Option<u32>,
    pub burn_percentage_bps: Option<u16>,
    pub min_burn_amount_sol: Option<f64>,
}

impl BurnPolicy {
    pub fn validate(&self) -> Result<(), BurnPolicyError> {
        if self.burn_percentage_bps > MAX_BURN_PERCENTAGE_BPS {
            return Err(BurnPolicyError::InvalidBurnPercentage(self.burn_percentage_bps));
        }
        if !(self.min_burn_amount_sol >= 0.0) {
            return Err(BurnPolicyError::InvalidMinBurn(self.min_burn_amount_sol));
        }
        Ok(())
    }

    /// Apply an update atomically: nothing changes if the result is invalid
    pub fn apply(&mut self, update: BurnPolicyUpdate) -> Result<(), BurnPolicyError> {
        let mut next = self.clone();
        if let Some(enabled) = update.enabled {
            next.enabled = enabled;
        }
        if let Some(threshold) = update.profit_threshold_bps {
            next.profit_threshold_bps = threshold;
        }
        if let Some(pct) = update.burn_percentage_bps {
            next.burn_percentage_bps = pct;
        }
        if let Some(min) = update.min_burn_amount_sol {
            next.min_burn_amount_sol = min;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// SOL to burn for a profit of `profit_sol` on `entry_sol`, if any
    pub fn burn_amount(&self, entry_sol: f64, profit_sol: f64) -> Option<f64> {
        if !self.enabled || entry_sol <= 0.0 || profit_sol <= 0.0 {
            return None;
        }
        let profit_bps = profit_sol / entry_sol * 10_000.0;
        if profit_bps < self.profit_threshold_bps as f64 {
            return None;
        }
        let amount = profit_sol * self.burn_percentage_bps as f64 / 10_000.0;
        (amount >= self.min_burn_amount_sol && amount > 0.0).then_some(amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnIntent {
    pub owner_wallet: String,
    pub token_mint: String,
    pub profit_sol: f64,
    pub amount_sol: f64,
    pub total_burned_sol: f64,
    pub burn_count: u64,
    pub planned_at: DateTime<Utc>,
}

/// Cumulative per-wallet burn totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurnLedger {
    pub total_burned_sol: f64,
    pub burn_count: u64,
}

impl BurnLedger {
    /// Plan a burn for a closed trade and book it in the ledger
    pub fn plan(&mut self, policy: &BurnPolicy, entry: &TradeJournalEntry, now: DateTime<Utc>) -> Option<BurnIntent> {
        let amount_sol = policy.burn_amount(entry.entry_sol, entry.pnl_sol)?;
        self.total_burned_sol += amount_sol;
        self.burn_count += 1;

        tracing::info!(
            "Burn planned: {:.6} SOL from {:.4} SOL profit on {} (total {:.6}, count {})",
            amount_sol,
            entry.pnl_sol,
            entry.token_mint,
            self.total_burned_sol,
            self.burn_count
        );

        Some(BurnIntent {
            owner_wallet: entry.owner_wallet.clone(),
            token_mint: entry.token_mint.clone(),
            profit_sol: entry.pnl_sol,
            amount_sol,
            total_burned_sol: self.total_burned_sol,
            burn_count: self.burn_count,
            planned_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> BurnPolicy {
        BurnPolicy {
            enabled: true,
            ..BurnPolicy::default()
        }
    }

    #[test]
    fn test_burn_amount_thresholds() {
        let policy = enabled();
        // 5% profit is under the 10% threshold
        assert_eq!(policy.burn_amount(1.0, 0.05), None);
        // 20% profit, 5% of 0.2 = 0.01
        let amount = policy.burn_amount(1.0, 0.2).unwrap();
        assert!((amount - 0.01).abs() < 1e-12);
        assert_eq!(policy.burn_amount(1.0, -0.2), None);
    }

    #[test]
    fn test_min_burn_amount() {
        let policy = BurnPolicy {
            min_burn_amount_sol: 0.05,
            ..enabled()
        };
        assert_eq!(policy.burn_amount(1.0, 0.2), None);
    }

    #[test]
    fn test_disabled_policy_never_burns() {
        assert_eq!(BurnPolicy::default().burn_amount(1.0, 10.0), None);
    }

    #[test]
    fn test_update_rejects_invalid_percentage() {
        let mut policy = enabled();
        let result = policy.apply(BurnPolicyUpdate {
            burn_percentage_bps: Some(10_001),
            profit_threshold_bps: Some(1),
            ..Default::default()
        });
        assert_eq!(result, Err(BurnPolicyError::InvalidBurnPercentage(10_001)));
        assert_eq!(policy.profit_threshold_bps, 1_000);

        policy
            .apply(BurnPolicyUpdate {
                burn_percentage_bps: Some(10_000),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(policy.burn_percentage_bps, 10_000);
    }
}
