use super::params::MomentumParams;
use crate::domain::{Action, Position, StrategyId, StrategySignal, TokenCandidate};
use crate::ports::StrategyPort;

/// Momentum Breakout: fresh 1h moves on elevated volume, with trailing and
/// reversal exits
#[derive(Debug, Clone, Default)]
pub struct MomentumBreakoutStrategy {
    params: MomentumParams,
}

impl MomentumBreakoutStrategy {
    pub fn new(params: MomentumParams) -> Self {
        Self { params }
    }

    fn signal(&self, action: Action, confidence: f64, reasoning: String) -> StrategySignal {
        StrategySignal {
            strategy: StrategyId::MomentumBreakout,
            action,
            confidence: confidence.clamp(0.0, self.params.max_confidence),
            position_size_pct: self.params.position_size_pct,
            profit_target_pct: self.params.profit_target_pct,
            stop_loss_pct: self.params.stop_loss_pct,
            reasoning,
        }
    }

    fn entry(&self, token: &TokenCandidate) -> Option<StrategySignal> {
        let change_1h = token.price_change_1h?;
        let change_24h = token.change_24h();
        let volume = token.volume_24h_usd?;
        let p = &self.params;

        let breakout = change_1h > p.min_change_1h_pct;
        let volume_ok = volume > p.volume_baseline_usd * p.volume_multiplier;
        let fresh = change_24h < change_1h;
        let not_pumped = change_24h < p.max_change_24h_pct;
        if !(breakout && volume_ok && fresh && not_pumped) {
            return None;
        }

        let confidence = p.base_confidence + (change_1h - p.min_change_1h_pct) * 2.0;
        Some(self.signal(
            Action::Buy,
            confidence,
            format!(
                "Breakout +{:.1}% 1h (24h {:+.1}%) on ${:.0} volume",
                change_1h, change_24h, volume
            ),
        ))
    }

    fn exit(&self, token: &TokenCandidate, position: &Position) -> Option<StrategySignal> {
        let pnl = token
            .current_price_sol()
            .map(|price| position.pnl_pct(price))
            .unwrap_or_else(|| position.current_pnl_pct());
        let peak = position.peak_profit_pct.max(pnl);
        let p = &self.params;

        if pnl >= p.profit_target_pct {
            return Some(self.signal(
                Action::Sell,
                85.0,
                format!("Profit target reached: {:.1}%", pnl),
            ));
        }
        if peak >= p.trailing_activation_pct && pnl < peak / 2.0 {
            return Some(self.signal(
                Action::Sell,
                80.0,
                format!("Trailing stop: {:.1}% from peak {:.1}%", pnl, peak),
            ));
        }
        if let Some(change_1h) = token.price_change_1h {
            if change_1h < p.reversal_change_1h_pct {
                return Some(self.signal(
                    Action::Sell,
                    75.0,
                    format!("Momentum reversal: {:.1}% 1h", change_1h),
                ));
            }
        }
        None
    }
}

impl StrategyPort for MomentumBreakoutStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::MomentumBreakout
    }

    fn evaluate(&self, token: &TokenCandidate, position: Option<&Position>) -> Option<StrategySignal> {
        if !self.params.enabled {
            return None;
        }
        match position {
            Some(position) => self.exit(token, position),
            None => self.entry(token),
        }
    }
}
