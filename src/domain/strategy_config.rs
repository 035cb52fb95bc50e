//! Hivemind Strategy Config
//!
//! Thresholds shared by every upstream stage. Regenerated by the
//! recalibration loop and read-only to everything else in between.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSentiment {
    Bullish,
    Bearish,
    Neutral,
    Volatile,
}

impl fmt::Display for MarketSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketSentiment::Bullish => "bullish",
            MarketSentiment::Bearish => "bearish",
            MarketSentiment::Neutral => "neutral",
            MarketSentiment::Volatile => "volatile",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskLevel {
    /// Risk tolerance passed to AI providers (0.0 - 1.0)
    pub fn tolerance(&self) -> f64 {
        match self {
            RiskLevel::Conservative => 0.3,
            RiskLevel::Moderate => 0.5,
            RiskLevel::Aggressive => 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HivemindStrategyConfig {
    pub market_sentiment: MarketSentiment,
    pub risk_level: RiskLevel,
    /// Per-trade budget as percent of portfolio value
    pub budget_per_trade_pct: f64,
    /// Minimum consensus confidence (0.0 - 1.0) to act on a buy
    pub min_confidence: f64,
    pub min_volume_usd: f64,
    pub min_liquidity_usd: f64,
    pub min_organic_score: f64,
    pub min_quality_score: f64,
    pub min_age_hours: f64,
    pub min_holders: u64,
    pub max_daily_trades: u32,
    /// Scales mode profit targets
    pub profit_target_multiplier: f64,
    /// Scales mode stop losses
    pub stop_loss_multiplier: f64,
    pub generated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl HivemindStrategyConfig {
    /// Conservative starting point used until the first recalibration
    pub fn baseline(now: DateTime<Utc>) -> Self {
        Self {
            market_sentiment: MarketSentiment::Neutral,
            risk_level: RiskLevel::Conservative,
            budget_per_trade_pct: 10.0,
            min_confidence: 0.6,
            min_volume_usd: 50_000.0,
            min_liquidity_usd: 20_000.0,
            min_organic_score: 40.0,
            min_quality_score: 40.0,
            min_age_hours: 1.0,
            min_holders: 100,
            max_daily_trades: 20,
            profit_target_multiplier: 1.0,
            stop_loss_multiplier: 1.0,
            generated_at: now,
            valid_until: now + Duration::hours(3),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }

    /// Sanity check before a regenerated config is committed
    pub fn validate(&self) -> Result<(), String> {
        if !(self.budget_per_trade_pct > 0.0 && self.budget_per_trade_pct <= 100.0) {
            return Err(format!("budget_per_trade_pct must be 0-100, got {}", self.budget_per_trade_pct));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(format!("min_confidence must be 0-1, got {}", self.min_confidence));
        }
        if self.min_volume_usd < 0.0 || self.min_liquidity_usd < 0.0 {
            return Err("volume and liquidity thresholds must be non-negative".to_string());
        }
        if !(0.0..=100.0).contains(&self.min_organic_score) || !(0.0..=100.0).contains(&self.min_quality_score) {
            return Err("score thresholds must be 0-100".to_string());
        }
        if self.profit_target_multiplier <= 0.0 || self.stop_loss_multiplier <= 0.0 {
            return Err("multipliers must be positive".to_string());
        }
        if self.valid_until <= self.generated_at {
            return Err("valid_until must be after generated_at".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_is_valid() {
        let now = Utc::now();
        let config = HivemindStrategyConfig::baseline(now);
        assert!(config.validate().is_ok());
        assert!(!config.is_expired(now));
        assert!(config.is_expired(now + Duration::hours(4)));
    }

    #[test]
    fn test_validate_rejects_bad_budget() {
        let mut config = HivemindStrategyConfig::baseline(Utc::now());
        config.budget_per_trade_pct = 0.0;
        assert!(config.validate().is_err());
        config.budget_per_trade_pct = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_risk_tolerance_ordering() {
        assert!(RiskLevel::Conservative.tolerance() < RiskLevel::Moderate.tolerance());
        assert!(RiskLevel::Moderate.tolerance() < RiskLevel::Aggressive.tolerance());
    }
}
