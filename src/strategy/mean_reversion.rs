//! Mean Reversion Strategy
//!
//! RSI extremes confirmed by proximity to a Bollinger band. When no band
//! data is available the RSI reading alone is used at reduced confidence.

use super::indicators::technicals_for;
use super::params::MeanReversionParams;
use crate::domain::{Action, Position, StrategyId, StrategySignal, TokenCandidate};
use crate::ports::StrategyPort;

#[derive(Debug, Clone, Default)]
pub struct MeanReversionStrategy {
    params: MeanReversionParams,
}

/// How the band check came out
enum BandCheck {
    Confirmed,
    Unavailable,
    OutOfRange,
}

impl MeanReversionStrategy {
    pub fn new(params: MeanReversionParams) -> Self {
        Self { params }
    }

    fn band_check(&self, price: f64, band: Option<f64>) -> BandCheck {
        match band {
            Some(band) if band > 0.0 => {
                let distance_pct = ((price - band) / band * 100.0).abs();
                if distance_pct <= self.params.band_tolerance_pct {
                    BandCheck::Confirmed
                } else {
                    BandCheck::OutOfRange
                }
            }
            _ => BandCheck::Unavailable,
        }
    }

    fn confidence(&self, past_threshold: f64, check: &BandCheck) -> f64 {
        let adjustment = match check {
            BandCheck::Confirmed => self.params.band_bonus,
            _ => -self.params.rsi_only_penalty,
        };
        (self.params.base_confidence + past_threshold + adjustment)
            .clamp(0.0, self.params.max_confidence)
    }

    fn signal(&self, action: Action, confidence: f64, reasoning: String) -> StrategySignal {
        StrategySignal {
            strategy: StrategyId::MeanReversion,
            action,
            confidence,
            position_size_pct: self.params.position_size_pct,
            profit_target_pct: self.params.profit_target_pct,
            stop_loss_pct: self.params.stop_loss_pct,
            reasoning,
        }
    }
}

impl StrategyPort for MeanReversionStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::MeanReversion
    }

    fn evaluate(&self, token: &TokenCandidate, position: Option<&Position>) -> Option<StrategySignal> {
        if !self.params.enabled {
            return None;
        }
        let price = token.current_price_sol()?;
        let technicals = technicals_for(token, &self.params)?;
        let rsi = technicals.rsi?;

        let (action, past, band) = if position.is_some() {
            if rsi <= self.params.overbought {
                return None;
            }
            (Action::Sell, rsi - self.params.overbought, technicals.upper_band)
        } else {
            if rsi >= self.params.oversold {
                return None;
            }
            (Action::Buy, self.params.oversold - rsi, technicals.lower_band)
        };

        let check = self.band_check(price, band);
        if matches!(check, BandCheck::OutOfRange) {
            tracing::debug!(
                "{}: RSI {:.1} but price {:.8} outside band tolerance",
                token.symbol,
                rsi,
                price
            );
            return None;
        }

        let confidence = self.confidence(past, &check);
        let basis = match check {
            BandCheck::Confirmed => "band confirmed",
            _ => "RSI only",
        };
        Some(self.signal(
            action,
            confidence,
            format!("RSI {:.1} ({}), {}", rsi, if action == Action::Buy { "oversold" } else { "overbought" }, basis),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OpenRequest, PositionMode, Technicals};
    use chrono::Utc;

    fn token(rsi: f64, price: f64, lower: Option<f64>, upper: Option<f64>) -> TokenCandidate {
        let mut t = TokenCandidate::new("m", "MR");
        t.price_sol = Some(price);
        t.technicals = Some(Technicals {
            rsi: Some(rsi),
            lower_band: lower,
            middle_band: None,
            upper_band: upper,
        });
        t
    }

    fn position() -> Position {
        Position::open(
            OpenRequest {
                owner_wallet: "w".into(),
                token_mint: "m".into(),
                symbol: "MR".into(),
                entry_price_sol: 1.0,
                amount_sol: 1.0,
                token_amount: 1.0,
                strategy: StrategyId::MeanReversion,
                confidence_at_entry: 0.7,
                profit_target_pct: 15.0,
                stop_loss_pct: 10.0,
                mode: PositionMode::Scalp,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_buy_near_lower_band() {
        let strategy = MeanReversionStrategy::default();
        let signal = strategy
            .evaluate(&token(20.0, 1.05, Some(1.0), Some(2.0)), None)
            .unwrap();
        assert_eq!(signal.action, Action::Buy);
        // 60 + 10 past threshold + 10 band bonus
        assert_eq!(signal.confidence, 80.0);
    }

    #[test]
    fn test_no_buy_when_price_far_above_lower_band() {
        let strategy = MeanReversionStrategy::default();
        assert!(strategy
            .evaluate(&token(20.0, 1.3, Some(1.0), Some(2.0)), None)
            .is_none());
    }

    #[test]
    fn test_rsi_only_has_reduced_confidence() {
        let strategy = MeanReversionStrategy::default();
        let signal = strategy.evaluate(&token(20.0, 1.3, None, None), None).unwrap();
        assert_eq!(signal.confidence, 55.0);
    }

    #[test]
    fn test_confidence_capped() {
        let strategy = MeanReversionStrategy::default();
        let signal = strategy
            .evaluate(&token(1.0, 1.0, Some(1.0), Some(2.0)), None)
            .unwrap();
        assert_eq!(signal.confidence, 95.0);
    }

    #[test]
    fn test_sell_only_with_position() {
        let strategy = MeanReversionStrategy::default();
        let t = token(80.0, 1.9, Some(1.0), Some(2.0));
        assert!(strategy.evaluate(&t, None).is_none());
        let signal = strategy.evaluate(&t, Some(&position())).unwrap();
        assert_eq!(signal.action, Action::Sell);
    }

    #[test]
    fn test_neutral_rsi_no_signal() {
        let strategy = MeanReversionStrategy::default();
        assert!(strategy.evaluate(&token(50.0, 1.0, Some(1.0), Some(2.0)), None).is_none());
    }
}
