use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction recommended by a signal producer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

impl Action {
    /// Parse a provider-supplied action string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "strong_buy" => Some(Action::Buy),
            "sell" | "strong_sell" => Some(Action::Sell),
            "hold" | "wait" => Some(Action::Hold),
            _ => None,
        }
    }
}

/// Deterministic strategy identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyId {
    MeanReversion,
    MomentumBreakout,
    GridTrading,
    /// Entry driven by AI consensus alone
    Hivemind,
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyId::MeanReversion => "MEAN_REVERSION",
            StrategyId::MomentumBreakout => "MOMENTUM_BREAKOUT",
            StrategyId::GridTrading => "GRID_TRADING",
            StrategyId::Hivemind => "HIVEMIND",
        };
        write!(f, "{}", s)
    }
}

/// Output of a single deterministic strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignal {
    pub strategy: StrategyId,
    pub action: Action,
    /// Confidence 0-100
    pub confidence: f64,
    pub position_size_pct: f64,
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub reasoning: String,
}

impl StrategySignal {
    pub fn validate(&self) -> Result<(), String> {
        if self.confidence.is_nan() || self.confidence < 0.0 || self.confidence > 100.0 {
            return Err(format!("Invalid confidence value: {}", self.confidence));
        }
        if self.position_size_pct < 0.0 {
            return Err(format!("Invalid position size: {}", self.position_size_pct));
        }
        Ok(())
    }
}

/// Producers of trade intents, ordered by precedence (highest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalSource {
    HardStopLoss,
    /// Mode profit target reached
    ProfitTarget,
    /// Mode hold time exhausted
    MaxHoldTime,
    AiSell,
    StrategySell,
    AiBuy,
    StrategyBuy,
}

/// A candidate intent from one producer
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub source: SignalSource,
    /// Normalised confidence 0.0 - 1.0
    pub confidence: f64,
    pub strategy: StrategyId,
    pub reasoning: String,
}

impl TradeIntent {
    pub fn action(&self) -> Action {
        match self.source {
            SignalSource::HardStopLoss
            | SignalSource::ProfitTarget
            | SignalSource::MaxHoldTime
            | SignalSource::AiSell
            | SignalSource::StrategySell => Action::Sell,
            SignalSource::AiBuy | SignalSource::StrategyBuy => Action::Buy,
        }
    }
}

/// Merge competing intents into one decision.
///
/// Precedence is a total order: hard stop-loss > profit target > max hold >
/// AI sell > strategy sell > AI buy > strategy buy. Within a source the most
/// confident intent wins.
pub fn merge_intents(mut intents: Vec<TradeIntent>) -> Option<TradeIntent> {
    intents.sort_by(|a, b| {
        a.source.cmp(&b.source).then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });
    intents.into_iter().next()
}
