use crate::domain::{Position, StrategyId, StrategySignal, TokenCandidate};

/// Deterministic quantitative strategy
pub trait StrategyPort: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Evaluate a candidate. With `position` set only exit signals are
    /// considered; without it only entries.
    fn evaluate(&self, token: &TokenCandidate, position: Option<&Position>) -> Option<StrategySignal>;
}
