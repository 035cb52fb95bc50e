use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::portfolio::PortfolioState;
use super::strategy_config::HivemindStrategyConfig;

#[derive(Debug, Error, PartialEq)]
pub enum RiskRejection {
    #[error("Drawdown pause active")]
    DrawdownPaused,

    #[error("Position already open for {0}")]
    DuplicatePosition(String),

    #[error("Daily trade cap reached ({0})")]
    DailyCapReached(u32),

    #[error("Confidence {0:.2} below minimum {1:.2}")]
    LowConfidence(f64, f64),

    #[error("No capital available after reserve")]
    ReserveExhausted,

    #[error("Trade size {0:.4} SOL below minimum notional {1:.4} SOL")]
    BelowMinNotional(f64, f64),
}

/// Portfolio-wide sizing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Percent of portfolio value never allocated
    pub reserve_pct: f64,
    /// Ceiling on a single trade as percent of capital available after reserve
    pub max_trade_pct_of_available: f64,
    /// Ceiling on a single position as percent of portfolio value
    pub max_position_pct: f64,
    pub min_notional_sol: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            reserve_pct: 10.0,
            max_trade_pct_of_available: 15.0,
            max_position_pct: 25.0,
            min_notional_sol: 0.01,
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("reserve_pct", self.reserve_pct),
            ("max_trade_pct_of_available", self.max_trade_pct_of_available),
            ("max_position_pct", self.max_position_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be within 0-100, got {}", name, value));
            }
        }
        if self.min_notional_sol < 0.0 {
            return Err("min_notional_sol must be non-negative".to_string());
        }
        Ok(())
    }

    /// SOL held back from allocation
    pub fn reserve_sol(&self, portfolio: &PortfolioState) -> f64 {
        portfolio.total_value_sol * self.reserve_pct / 100.0
    }

    /// Free SOL above the reserve
    pub fn available_after_reserve(&self, portfolio: &PortfolioState) -> f64 {
        (portfolio.cash_sol - self.reserve_sol(portfolio)).max(0.0)
    }

    /// Largest trade the ceilings allow right now
    pub fn max_trade_sol(&self, portfolio: &PortfolioState) -> f64 {
        let available = self.available_after_reserve(portfolio);
        let per_trade = available * self.max_trade_pct_of_available / 100.0;
        let concentration = portfolio.total_value_sol * self.max_position_pct / 100.0;
        per_trade.min(concentration).min(available)
    }
}

/// Approved trade size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedTrade {
    pub amount_sol: f64,
    /// True when a ceiling cut the requested budget
    pub capped: bool,
}

/// Gatekeeper between a buy signal and the trade executor
#[derive(Debug, Clone, Default)]
pub struct RiskGovernor {
    limits: RiskLimits,
}

impl RiskGovernor {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Size a new buy, or reject it.
    ///
    /// `confidence` is on the 0.0 - 1.0 scale.
    pub fn size_trade(
        &self,
        portfolio: &PortfolioState,
        config: &HivemindStrategyConfig,
        mint: &str,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<SizedTrade, RiskRejection> {
        if portfolio.drawdown_paused {
            return Err(RiskRejection::DrawdownPaused);
        }
        if portfolio.has_position(mint) {
            return Err(RiskRejection::DuplicatePosition(mint.to_string()));
        }

        let trades_today = match portfolio.trading_day {
            Some(day) if day == now.date_naive() => portfolio.trades_today,
            _ => 0,
        };
        if trades_today >= config.max_daily_trades {
            return Err(RiskRejection::DailyCapReached(config.max_daily_trades));
        }

        if confidence < config.min_confidence {
            return Err(RiskRejection::LowConfidence(confidence, config.min_confidence));
        }

        let ceiling = self.limits.max_trade_sol(portfolio);
        if ceiling <= 0.0 {
            return Err(RiskRejection::ReserveExhausted);
        }

        let requested = portfolio.total_value_sol * config.budget_per_trade_pct / 100.0;
        let amount_sol = requested.min(ceiling);
        if amount_sol < self.limits.min_notional_sol {
            return Err(RiskRejection::BelowMinNotional(
                amount_sol,
                self.limits.min_notional_sol,
            ));
        }

        Ok(SizedTrade {
            amount_sol,
            capped: amount_sol < requested,
        })
    }

    /// Reserve exhausted: rotation is the only way to open something new
    pub fn reserve_exhausted(&self, portfolio: &PortfolioState) -> bool {
        self.limits.max_trade_sol(portfolio) < self.limits.min_notional_sol
    }
}
