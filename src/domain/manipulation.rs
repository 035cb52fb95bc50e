//! Manipulation Screener
//!
//! Scores candidates for bundle / pump-and-dump activity using additive
//! heuristics. Scores are capped at 100. Critical tokens go to the blacklist,
//! suspicious warnings pass through with an annotation, and tokens that cannot
//! be scored fail open.

use serde::{Deserialize, Serialize};

use super::blacklist::Severity;
use super::token::TokenCandidate;

/// Default score at which a token is flagged as suspicious
pub const DEFAULT_SUSPICIOUS_THRESHOLD: u8 = 60;

/// Default score at which a token is critical and blacklisted
pub const DEFAULT_CRITICAL_THRESHOLD: u8 = 70;

/// Screener thresholds. All heuristics are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub suspicious_threshold: u8,
    pub critical_threshold: u8,
    pub very_low_organic: f64,
    pub low_organic: f64,
    pub very_low_quality: f64,
    pub low_quality: f64,
    /// 24h transaction count considered "high activity"
    pub high_txn_count: u64,
    /// Buy share above this (or below 1 - this) is extreme skew
    pub extreme_buy_ratio: f64,
    /// Minimum buys + sells before skew is meaningful
    pub min_skew_sample: u64,
    pub max_volume_liquidity_ratio: f64,
    pub new_pair_age_hours: f64,
    pub new_pair_volume_usd: f64,
    pub extreme_change_1h_pct: f64,
    pub extreme_change_24h_pct: f64,
    /// 1h transaction count implying bot-driven activity
    pub bot_txns_per_hour: u64,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            suspicious_threshold: DEFAULT_SUSPICIOUS_THRESHOLD,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            very_low_organic: 30.0,
            low_organic: 50.0,
            very_low_quality: 30.0,
            low_quality: 50.0,
            high_txn_count: 5_000,
            extreme_buy_ratio: 0.85,
            min_skew_sample: 20,
            max_volume_liquidity_ratio: 20.0,
            new_pair_age_hours: 6.0,
            new_pair_volume_usd: 500_000.0,
            extreme_change_1h_pct: 50.0,
            extreme_change_24h_pct: 200.0,
            bot_txns_per_hour: 1_000,
        }
    }
}

/// A single triggered heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulationReason {
    pub name: String,
    pub points: u8,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulationScore {
    pub token_mint: String,
    pub score: u8,
    pub reasons: Vec<ManipulationReason>,
    pub severity: Severity,
    pub is_suspicious: bool,
    /// The screener lacked the data to score this token and failed open
    pub data_degraded: bool,
}

impl ManipulationScore {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    /// Short summary suitable for a blacklist reason
    pub fn summary(&self) -> String {
        let names: Vec<&str> = self.reasons.iter().map(|r| r.name.as_str()).collect();
        format!("manipulation score {} ({})", self.score, names.join(", "))
    }
}

/// What the caller should do with a screened token
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenVerdict {
    /// Safe to evaluate
    Pass,
    /// Pass through with a warning annotation
    PassWithWarning(String),
    /// Blacklist and drop
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct ManipulationScreener {
    config: ScreenerConfig,
}

impl ManipulationScreener {
    pub fn new(config: ScreenerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Score a candidate
    pub fn score(&self, token: &TokenCandidate) -> ManipulationScore {
        let c = &self.config;

        if token.organic_score.is_none() && token.quality_score.is_none() {
            tracing::warn!(
                "Screener degraded for {} ({}): no organic or quality score, failing open",
                token.symbol,
                token.mint
            );
            return ManipulationScore {
                token_mint: token.mint.clone(),
                score: 0,
                reasons: Vec::new(),
                severity: Severity::Warning,
                is_suspicious: false,
                data_degraded: true,
            };
        }

        let mut reasons = Vec::new();
        let mut total: u32 = 0;
        let mut add = |name: &str, points: u8, detail: String| {
            total += points as u32;
            reasons.push(ManipulationReason {
                name: name.to_string(),
                points,
                detail,
            });
        };

        let organic = token.organic_score;
        let organic_below = |limit: f64| organic.map_or(false, |o| o < limit);

        if let Some(o) = organic {
            if o < c.very_low_organic {
                add("Very low organic score", 40, format!("organic score {:.0}", o));
            } else if o < c.low_organic {
                add("Low organic score", 20, format!("organic score {:.0}", o));
            }
        }

        if let Some(q) = token.quality_score {
            if q < c.very_low_quality {
                add("Very low quality score", 30, format!("quality score {:.0}", q));
            } else if q < c.low_quality {
                add("Low quality score", 15, format!("quality score {:.0}", q));
            }
        }

        if let Some(txns) = token.txns_24h {
            if txns > c.high_txn_count && organic_below(c.low_organic) {
                add(
                    "High activity with low organic score",
                    25,
                    format!("{} transactions in 24h", txns),
                );
            }
        }

        if let Some((ratio, total_trades)) = token.buy_ratio() {
            if total_trades >= c.min_skew_sample
                && (ratio > c.extreme_buy_ratio || ratio < 1.0 - c.extreme_buy_ratio)
            {
                add(
                    "Extreme buy/sell skew",
                    20,
                    format!("{:.0}% buys over {} trades", ratio * 100.0, total_trades),
                );
            }
        }

        if let Some(ratio) = token.volume_liquidity_ratio() {
            if ratio > c.max_volume_liquidity_ratio {
                add(
                    "Volume far exceeds liquidity",
                    20,
                    format!("volume/liquidity {:.1}x", ratio),
                );
            }
        }

        if let (Some(age), Some(volume)) = (token.estimated_age_hours, token.volume_24h_usd) {
            if age < c.new_pair_age_hours && volume > c.new_pair_volume_usd && organic_below(c.low_organic) {
                add(
                    "New pair with inorganic volume",
                    25,
                    format!("{:.1}h old, ${:.0} volume", age, volume),
                );
            }
        }

        let swing_1h = token.price_change_1h.map_or(false, |p| p.abs() > c.extreme_change_1h_pct);
        let swing_24h = token.price_change_24h.map_or(false, |p| p.abs() > c.extreme_change_24h_pct);
        if swing_1h || swing_24h {
            add(
                "Extreme price swing",
                15,
                format!("1h {:+.1}%, 24h {:+.1}%", token.change_1h(), token.change_24h()),
            );
        }

        if let Some(txns) = token.txns_1h {
            if txns > c.bot_txns_per_hour {
                add("Bot-driven trade frequency", 20, format!("{} transactions in 1h", txns));
            }
        }

        let score = total.min(100) as u8;
        let severity = if score >= c.critical_threshold {
            Severity::Critical
        } else {
            Severity::Warning
        };

        ManipulationScore {
            token_mint: token.mint.clone(),
            score,
            reasons,
            severity,
            is_suspicious: score >= c.suspicious_threshold,
            data_degraded: false,
        }
    }

    /// Map a score to an action
    pub fn verdict(&self, score: &ManipulationScore) -> ScreenVerdict {
        if score.is_critical() {
            ScreenVerdict::Reject
        } else if score.is_suspicious {
            ScreenVerdict::PassWithWarning(score.summary())
        } else if score.data_degraded {
            ScreenVerdict::PassWithWarning("screener data unavailable".to_string())
        } else {
            ScreenVerdict::Pass
        }
    }
}
