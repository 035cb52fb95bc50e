use super::grid_trading::GridTradingStrategy;
use super::mean_reversion::MeanReversionStrategy;
use super::momentum_breakout::MomentumBreakoutStrategy;
use super::params::StrategyParams;
use crate::domain::{Action, Position, StrategySignal, TokenCandidate};
use crate::ports::StrategyPort;

/// Runs every deterministic strategy and keeps the single best signal
pub struct StrategyEvaluator {
    strategies: Vec<Box<dyn StrategyPort>>,
}

impl StrategyEvaluator {
    pub fn new(params: &StrategyParams) -> Self {
        Self::with_strategies(vec![
            Box::new(MeanReversionStrategy::new(params.mean_reversion.clone())),
            Box::new(MomentumBreakoutStrategy::new(params.momentum.clone())),
            Box::new(GridTradingStrategy::new(params.grid.clone())),
        ])
    }

    pub fn with_strategies(strategies: Vec<Box<dyn StrategyPort>>) -> Self {
        Self { strategies }
    }

    /// Highest-confidence SELL when a position is open, otherwise the
    /// highest-confidence BUY.
    ///
    /// Exit rules belong to the strategy that opened the position. Hivemind
    /// entries have no strategy exit and rely on the lifecycle bands.
    pub fn evaluate(&self, token: &TokenCandidate, position: Option<&Position>) -> Option<StrategySignal> {
        let wanted = if position.is_some() { Action::Sell } else { Action::Buy };

        self.strategies
            .iter()
            .filter(|s| position.map_or(true, |p| s.id() == p.strategy))
            .filter_map(|s| s.evaluate(token, position))
            .filter(|signal| signal.action == wanted)
            .filter(|signal| match signal.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Dropping invalid {} signal: {}", signal.strategy, e);
                    false
                }
            })
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OpenRequest, PositionMode, StrategyId, Technicals};
    use chrono::Utc;

    #[test]
    fn test_picks_highest_confidence_buy() {
        let evaluator = StrategyEvaluator::new(&StrategyParams::default());
        let mut t = TokenCandidate::new("m", "M");
        t.price_sol = Some(1.0);
        t.price_change_1h = Some(8.0);
        t.price_change_24h = Some(6.0);
        t.volume_24h_usd = Some(500_000.0);
        t.technicals = Some(Technicals {
            rsi: Some(25.0),
            lower_band: Some(0.98),
            middle_band: None,
            upper_band: Some(1.4),
        });

        // momentum 66 vs mean reversion 60 + 5 + 10 = 75
        let signal = evaluator.evaluate(&t, None).unwrap();
        assert_eq!(signal.strategy, StrategyId::MeanReversion);
    }

    #[test]
    fn test_open_position_only_considers_sells() {
        let evaluator = StrategyEvaluator::new(&StrategyParams::default());
        let position = Position::open(
            OpenRequest {
                owner_wallet: "w".into(),
                token_mint: "m".into(),
                symbol: "M".into(),
                entry_price_sol: 1.0,
                amount_sol: 1.0,
                token_amount: 1.0,
                strategy: StrategyId::GridTrading,
                confidence_at_entry: 0.6,
                profit_target_pct: 3.0,
                stop_loss_pct: 6.0,
                mode: PositionMode::Scalp,
            },
            Utc::now(),
        )
        .unwrap();

        let mut t = TokenCandidate::new("m", "M");
        t.price_sol = Some(1.04);
        t.price_change_1h = Some(1.0);
        t.price_change_24h = Some(2.0);
        let signal = evaluator.evaluate(&t, Some(&position)).unwrap();
        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.strategy, StrategyId::GridTrading);
    }

    fn held_by(strategy: StrategyId) -> Position {
        Position::open(
            OpenRequest {
                owner_wallet: "w".into(),
                token_mint: "m".into(),
                symbol: "M".into(),
                entry_price_sol: 1.0,
                amount_sol: 1.0,
                token_amount: 1.0,
                strategy,
                confidence_at_entry: 0.7,
                profit_target_pct: 25.0,
                stop_loss_pct: 12.0,
                mode: PositionMode::Scalp,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_exit_rules_scoped_to_opening_strategy() {
        let evaluator = StrategyEvaluator::new(&StrategyParams::default());
        let mut t = TokenCandidate::new("m", "M");
        t.price_sol = Some(1.04);
        t.price_change_1h = Some(3.0);
        t.price_change_24h = Some(4.0);

        // +4% is past a grid step but not a momentum exit
        assert!(evaluator.evaluate(&t, Some(&held_by(StrategyId::MomentumBreakout))).is_none());
        assert!(evaluator.evaluate(&t, Some(&held_by(StrategyId::MeanReversion))).is_none());
        assert!(evaluator.evaluate(&t, Some(&held_by(StrategyId::Hivemind))).is_none());
        assert!(evaluator.evaluate(&t, Some(&held_by(StrategyId::GridTrading))).is_some());
    }

    #[test]
    fn test_no_signal() {
        let evaluator = StrategyEvaluator::new(&StrategyParams::default());
        assert!(evaluator.evaluate(&TokenCandidate::new("m", "M"), None).is_none());
    }
}
