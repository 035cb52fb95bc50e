//! Strategy recalibration
//!
//! Turns recent journal statistics into a fresh [`HivemindStrategyConfig`].
//! Loosening requires both a full sample and a very strong record; every
//! other outcome tightens or stays at the conservative baseline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::journal::JournalStats;
use super::strategy_config::{HivemindStrategyConfig, MarketSentiment, RiskLevel};

#[derive(Debug, Error)]
pub enum RecalibrationError {
    #[error("Generated config failed validation: {0}")]
    InvalidConfig(String),

    #[error("Journal unavailable: {0}")]
    JournalUnavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecalibrationSettings {
    /// Trades needed before any loosening
    pub min_sample: usize,
    /// Win rate (0-1) required for the aggressive profile
    pub high_confidence_win_rate: f64,
    /// Avg P/L percent magnitude treated as volatile
    pub volatile_avg_pnl_pct: f64,
    pub interval_minutes: i64,
}

impl Default for RecalibrationSettings {
    fn default() -> Self {
        Self {
            min_sample: 5,
            high_confidence_win_rate: 0.7,
            volatile_avg_pnl_pct: 15.0,
            interval_minutes: 180,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recalibrator {
    settings: RecalibrationSettings,
    baseline: HivemindStrategyConfig,
}

impl Recalibrator {
    pub fn new(settings: RecalibrationSettings, baseline: HivemindStrategyConfig) -> Self {
        Self { settings, baseline }
    }

    pub fn settings(&self) -> &RecalibrationSettings {
        &self.settings
    }

    pub fn classify(&self, stats: &JournalStats) -> MarketSentiment {
        if stats.trades < self.settings.min_sample {
            return MarketSentiment::Neutral;
        }
        if stats.avg_pnl_pct.abs() >= self.settings.volatile_avg_pnl_pct {
            return MarketSentiment::Volatile;
        }
        if stats.win_rate >= 0.55 && stats.avg_pnl_pct > 0.0 {
            MarketSentiment::Bullish
        } else if stats.win_rate < 0.4 && stats.avg_pnl_pct < 0.0 {
            MarketSentiment::Bearish
        } else {
            MarketSentiment::Neutral
        }
    }

    /// Produce the next config. On error the caller keeps the prior one.
    pub fn recalibrate(
        &self,
        stats: &JournalStats,
        now: DateTime<Utc>,
    ) -> Result<HivemindStrategyConfig, RecalibrationError> {
        let sentiment = self.classify(stats);
        let mut next = self.baseline.clone();
        next.market_sentiment = sentiment;
        next.risk_level = RiskLevel::Conservative;

        match sentiment {
            MarketSentiment::Bullish => {
                let strong = stats.trades >= self.settings.min_sample
                    && stats.win_rate >= self.settings.high_confidence_win_rate;
                if strong {
                    next.risk_level = RiskLevel::Aggressive;
                    next.budget_per_trade_pct *= 1.5;
                    next.min_confidence = (next.min_confidence - 0.1).max(0.4);
                    next.max_daily_trades += next.max_daily_trades / 2;
                    next.profit_target_multiplier = 1.25;
                } else {
                    next.risk_level = RiskLevel::Moderate;
                    next.profit_target_multiplier = 1.1;
                }
            }
            MarketSentiment::Bearish => {
                next.budget_per_trade_pct *= 0.5;
                next.min_confidence = (next.min_confidence + 0.15).min(0.95);
                next.min_volume_usd *= 1.5;
                next.min_liquidity_usd *= 1.5;
                next.max_daily_trades = (next.max_daily_trades / 2).max(1);
                next.stop_loss_multiplier = 0.8;
            }
            MarketSentiment::Volatile => {
                next.budget_per_trade_pct *= 0.5;
                next.min_confidence = (next.min_confidence + 0.1).min(0.95);
                next.min_liquidity_usd *= 1.5;
                next.stop_loss_multiplier = 0.8;
                next.profit_target_multiplier = 1.2;
            }
            MarketSentiment::Neutral => {}
        }

        next.budget_per_trade_pct = next.budget_per_trade_pct.min(100.0);
        next.generated_at = now;
        next.valid_until = now + Duration::minutes(self.settings.interval_minutes);
        next.validate().map_err(RecalibrationError::InvalidConfig)?;

        tracing::info!(
            "Recalibrated: sentiment={} risk={:?} budget={:.1}% min_conf={:.2} ({} trades, win rate {:.0}%)",
            next.market_sentiment,
            next.risk_level,
            next.budget_per_trade_pct,
            next.min_confidence,
            stats.trades,
            stats.win_rate * 100.0
        );
        Ok(next)
    }
}
