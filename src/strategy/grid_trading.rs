use super::params::GridParams;
use crate::domain::{Action, Position, StrategyId, StrategySignal, TokenCandidate};
use crate::ports::StrategyPort;

/// Grid Trading: buy shallow dips in a ranging market, sell one grid step up
#[derive(Debug, Clone, Default)]
pub struct GridTradingStrategy {
    params: GridParams,
}

impl GridTradingStrategy {
    pub fn new(params: GridParams) -> Self {
        Self { params }
    }

    pub fn is_ranging(&self, token: &TokenCandidate) -> bool {
        match (token.price_change_1h, token.price_change_24h) {
            (Some(h1), Some(h24)) => {
                h1.abs() < self.params.range_change_1h_pct && h24.abs() < self.params.range_change_24h_pct
            }
            _ => false,
        }
    }

    fn signal(&self, action: Action, confidence: f64, reasoning: String) -> StrategySignal {
        StrategySignal {
            strategy: StrategyId::GridTrading,
            action,
            confidence: confidence.clamp(0.0, 100.0),
            position_size_pct: self.params.position_size_pct,
            profit_target_pct: self.params.grid_step_pct,
            stop_loss_pct: self.params.stop_loss_pct,
            reasoning,
        }
    }
}

impl StrategyPort for GridTradingStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::GridTrading
    }

    fn evaluate(&self, token: &TokenCandidate, position: Option<&Position>) -> Option<StrategySignal> {
        if !self.params.enabled {
            return None;
        }

        if let Some(position) = position {
            let pnl = token
                .current_price_sol()
                .map(|price| position.pnl_pct(price))
                .unwrap_or_else(|| position.current_pnl_pct());
            return (pnl >= self.params.grid_step_pct).then(|| {
                self.signal(
                    Action::Sell,
                    self.params.base_confidence + 10.0,
                    format!("Grid step reached: {:.1}%", pnl),
                )
            });
        }

        if !self.is_ranging(token) {
            return None;
        }
        let dip = token.change_1h();
        if dip > self.params.dip_min_pct || dip < self.params.dip_max_pct {
            return None;
        }

        // deeper dip within the band, higher confidence
        let depth = (self.params.dip_min_pct - dip) / (self.params.dip_min_pct - self.params.dip_max_pct);
        Some(self.signal(
            Action::Buy,
            self.params.base_confidence + depth * 15.0,
            format!("Ranging market, {:.1}% 1h dip", dip),
        ))
    }
}
