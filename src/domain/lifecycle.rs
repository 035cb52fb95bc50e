//! Position exit rules.
//!
//! Every trigger is raised as a sell intent and resolved by the shared merge
//! order: hard stop-loss, profit target, max hold, AI sell, strategy sell.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::consensus::ConsensusResult;
use super::position::{Position, PositionMode};
use super::signal::{merge_intents, Action, SignalSource, StrategySignal, TradeIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    ProfitTarget,
    MaxHoldTime,
    AiSell,
    StrategySell,
    Rotation,
    Manual,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::ProfitTarget => "PROFIT_TARGET",
            ExitReason::MaxHoldTime => "MAX_HOLD_TIME",
            ExitReason::AiSell => "AI_SELL",
            ExitReason::StrategySell => "STRATEGY_SELL",
            ExitReason::Rotation => "ROTATION",
            ExitReason::Manual => "MANUAL",
        };
        write!(f, "{}", s)
    }
}

/// Target, stop and hold-time band for one mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeLimits {
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub max_hold_minutes: i64,
}

impl ModeLimits {
    pub fn max_hold(&self) -> Duration {
        Duration::minutes(self.max_hold_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub scalp: ModeLimits,
    pub swing: ModeLimits,
    /// Entries at or above this confidence (0-1) are opened as SWING
    pub swing_min_confidence: f64,
    /// AI consensus sell confidence that closes a position
    pub ai_sell_threshold: f64,
    /// Confidence margin a new opportunity needs over the weakest position
    pub rotation_min_advantage: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            scalp: ModeLimits {
                profit_target_pct: 15.0,
                stop_loss_pct: 10.0,
                max_hold_minutes: 240,
            },
            swing: ModeLimits {
                profit_target_pct: 50.0,
                stop_loss_pct: 20.0,
                max_hold_minutes: 72 * 60,
            },
            swing_min_confidence: 0.75,
            ai_sell_threshold: 0.45,
            rotation_min_advantage: 0.15,
        }
    }
}

impl LifecycleConfig {
    pub fn limits(&self, mode: PositionMode) -> &ModeLimits {
        match mode {
            PositionMode::Scalp => &self.scalp,
            PositionMode::Swing => &self.swing,
        }
    }

    pub fn mode_for(&self, confidence: f64) -> PositionMode {
        if confidence >= self.swing_min_confidence {
            PositionMode::Swing
        } else {
            PositionMode::Scalp
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, limits) in [("scalp", &self.scalp), ("swing", &self.swing)] {
            if limits.profit_target_pct <= 0.0 || limits.stop_loss_pct <= 0.0 {
                return Err(format!("{} target and stop must be positive", name));
            }
            if limits.stop_loss_pct >= 100.0 {
                return Err(format!("{} stop_loss_pct must be below 100", name));
            }
            if limits.max_hold_minutes <= 0 {
                return Err(format!("{} max_hold_minutes must be positive", name));
            }
        }
        if !(0.0..=1.0).contains(&self.ai_sell_threshold) {
            return Err("ai_sell_threshold must be within 0-1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitDecision {
    pub reason: ExitReason,
    pub reasoning: String,
}

/// Decide whether `position` should be closed at its last marked price.
///
/// Every trigger becomes an intent and [`merge_intents`] picks the winner.
pub fn evaluate_exit(
    position: &Position,
    config: &LifecycleConfig,
    ai: Option<&ConsensusResult>,
    strategy_sell: Option<&StrategySignal>,
    now: DateTime<Utc>,
) -> Option<ExitDecision> {
    let pnl = position.current_pnl_pct();
    let limits = config.limits(position.mode);
    let exit = |source, reasoning| TradeIntent {
        source,
        confidence: 1.0,
        strategy: position.strategy,
        reasoning,
    };

    let mut intents = Vec::new();
    if pnl <= -position.stop_loss_pct {
        intents.push(exit(
            SignalSource::HardStopLoss,
            format!("P/L {:.1}% hit stop -{:.1}%", pnl, position.stop_loss_pct),
        ));
    }
    if pnl >= position.profit_target_pct {
        intents.push(exit(
            SignalSource::ProfitTarget,
            format!("P/L {:.1}% reached target {:.1}%", pnl, position.profit_target_pct),
        ));
    }
    let held = position.held_for(now);
    if held >= limits.max_hold() {
        intents.push(exit(
            SignalSource::MaxHoldTime,
            format!(
                "Held {}m, {:?} limit {}m",
                held.num_minutes(),
                position.mode,
                limits.max_hold_minutes
            ),
        ));
    }
    if let Some(consensus) = ai.filter(|c| c.is_sell_with(config.ai_sell_threshold)) {
        intents.push(TradeIntent {
            source: SignalSource::AiSell,
            confidence: consensus.confidence,
            strategy: position.strategy,
            reasoning: format!(
                "AI consensus SELL {:.0}% ({} votes)",
                consensus.confidence * 100.0,
                consensus.vote_count
            ),
        });
    }
    if let Some(signal) = strategy_sell.filter(|s| s.action == Action::Sell) {
        intents.push(TradeIntent {
            source: SignalSource::StrategySell,
            confidence: signal.confidence / 100.0,
            strategy: signal.strategy,
            reasoning: signal.reasoning.clone(),
        });
    }

    let intent = merge_intents(intents)?;
    let reason = match intent.source {
        SignalSource::HardStopLoss => ExitReason::StopLoss,
        SignalSource::ProfitTarget => ExitReason::ProfitTarget,
        SignalSource::MaxHoldTime => ExitReason::MaxHoldTime,
        SignalSource::AiSell => ExitReason::AiSell,
        SignalSource::StrategySell => ExitReason::StrategySell,
        SignalSource::AiBuy | SignalSource::StrategyBuy => return None,
    };
    Some(ExitDecision {
        reason,
        reasoning: intent.reasoning,
    })
}

/// Weakest open position: lowest entry confidence, then worst P/L
pub fn weakest_position<'a, I>(positions: I) -> Option<&'a Position>
where
    I: IntoIterator<Item = &'a Position>,
{
    positions.into_iter().min_by(|a, b| {
        a.confidence_at_entry
            .partial_cmp(&b.confidence_at_entry)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.current_pnl_pct()
                    .partial_cmp(&b.current_pnl_pct())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    })
}

/// Position to close so a materially better opportunity can be opened
pub fn rotation_candidate<'a, I>(
    positions: I,
    opportunity_confidence: f64,
    config: &LifecycleConfig,
) -> Option<&'a Position>
where
    I: IntoIterator<Item = &'a Position>,
{
    weakest_position(positions).filter(|weakest| {
        opportunity_confidence >= weakest.confidence_at_entry + config.rotation_min_advantage
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::consensus::{aggregate, AiVote};
    use crate::domain::position::OpenRequest;
    use crate::domain::signal::StrategyId;

    fn open(mint: &str, confidence: f64, mode: PositionMode, now: DateTime<Utc>) -> Position {
        let limits = LifecycleConfig::default();
        let band = limits.limits(mode);
        Position::open(
            OpenRequest {
                owner_wallet: "w".into(),
                token_mint: mint.into(),
                symbol: "TKN".into(),
                entry_price_sol: 1.0,
                amount_sol: 1.0,
                token_amount: 1.0,
                strategy: StrategyId::MomentumBreakout,
                confidence_at_entry: confidence,
                profit_target_pct: band.profit_target_pct,
                stop_loss_pct: band.stop_loss_pct,
                mode,
            },
            now,
        )
        .unwrap()
    }

    fn ai(action: Action, confidence: f64) -> ConsensusResult {
        let votes = (0..3)
            .map(|i| AiVote {
                provider_id: format!("p{}", i),
                action,
                confidence,
                suggested_amount_sol: 0.0,
                reasoning: String::new(),
                latency_ms: 1,
                error: None,
            })
            .collect();
        aggregate(votes, 0, 2)
    }

    #[test]
    fn test_stop_loss_overrides_bullish_ai() {
        let now = Utc::now();
        let mut position = open("m", 0.7, PositionMode::Swing, now);
        position.mark(0.75).unwrap();
        let bullish = ai(Action::Buy, 0.99);
        let decision = evaluate_exit(&position, &LifecycleConfig::default(), Some(&bullish), None, now).unwrap();
        assert_eq!(decision.reason, ExitReason::StopLoss);
    }

    #[test]
    fn test_profit_target() {
        let now = Utc::now();
        let mut position = open("m", 0.6, PositionMode::Scalp, now);
        position.mark(1.2).unwrap();
        let decision = evaluate_exit(&position, &LifecycleConfig::default(), None, None, now).unwrap();
        assert_eq!(decision.reason, ExitReason::ProfitTarget);
    }

    #[test]
    fn test_max_hold() {
        let now = Utc::now();
        let position = open("m", 0.6, PositionMode::Scalp, now);
        let later = now + Duration::minutes(241);
        let decision = evaluate_exit(&position, &LifecycleConfig::default(), None, None, later).unwrap();
        assert_eq!(decision.reason, ExitReason::MaxHoldTime);
        assert!(evaluate_exit(&position, &LifecycleConfig::default(), None, None, now).is_none());
    }

    #[test]
    fn test_mechanical_exits_outrank_each_other_in_order() {
        let now = Utc::now();
        let later = now + Duration::minutes(241);
        let bearish = ai(Action::Sell, 0.9);

        let mut winner = open("m", 0.6, PositionMode::Scalp, now);
        winner.mark(1.2).unwrap();
        let decision = evaluate_exit(&winner, &LifecycleConfig::default(), Some(&bearish), None, later).unwrap();
        assert_eq!(decision.reason, ExitReason::ProfitTarget);

        let stale = open("m", 0.6, PositionMode::Scalp, now);
        let decision = evaluate_exit(&stale, &LifecycleConfig::default(), Some(&bearish), None, later).unwrap();
        assert_eq!(decision.reason, ExitReason::MaxHoldTime);
    }

    #[test]
    fn test_ai_sell_threshold_and_precedence() {
        let now = Utc::now();
        let position = open("m", 0.6, PositionMode::Scalp, now);
        let config = LifecycleConfig::default();
        let strategy = StrategySignal {
            strategy: StrategyId::MomentumBreakout,
            action: Action::Sell,
            confidence: 90.0,
            position_size_pct: 0.0,
            profit_target_pct: 0.0,
            stop_loss_pct: 0.0,
            reasoning: "reversal".into(),
        };

        let weak = ai(Action::Sell, 0.4);
        let decision = evaluate_exit(&position, &config, Some(&weak), Some(&strategy), now).unwrap();
        assert_eq!(decision.reason, ExitReason::StrategySell);

        let strong = ai(Action::Sell, 0.5);
        let decision = evaluate_exit(&position, &config, Some(&strong), Some(&strategy), now).unwrap();
        assert_eq!(decision.reason, ExitReason::AiSell);
    }

    #[test]
    fn test_rotation_picks_weakest_only_when_materially_better() {
        let now = Utc::now();
        let mut a = open("a", 0.6, PositionMode::Scalp, now);
        let mut b = open("b", 0.6, PositionMode::Scalp, now);
        let c = open("c", 0.8, PositionMode::Swing, now);
        a.mark(1.05).unwrap();
        b.mark(0.95).unwrap();
        let positions = vec![a, b, c];
        let config = LifecycleConfig::default();

        let picked = rotation_candidate(positions.iter(), 0.9, &config).unwrap();
        assert_eq!(picked.token_mint, "b");
        assert!(rotation_candidate(positions.iter(), 0.7, &config).is_none());
    }

    #[test]
    fn test_mode_selection() {
        let config = LifecycleConfig::default();
        assert_eq!(config.mode_for(0.8), PositionMode::Swing);
        assert_eq!(config.mode_for(0.6), PositionMode::Scalp);
        assert!(config.validate().is_ok());
    }
}
