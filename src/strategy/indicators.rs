//! RSI and Bollinger band derivation from recent price samples

use statrs::statistics::Statistics;

use super::params::MeanReversionParams;
use crate::domain::{Technicals, TokenCandidate};

/// Wilder RSI over `period`. Needs `period + 1` samples.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = changes.split_at(period);

    let mut avg_gain = seed.iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = seed.iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    let n = period as f64;
    for change in rest {
        avg_gain = (avg_gain * (n - 1.0) + change.max(0.0)) / n;
        avg_loss = (avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
    }

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

/// Bollinger bands over the last `period` samples, `k` population std devs wide
pub fn bollinger(prices: &[f64], period: usize, k: f64) -> Option<Bands> {
    if period < 2 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let middle = window.iter().mean();
    let std = window.iter().population_std_dev();
    if !middle.is_finite() || !std.is_finite() {
        return None;
    }
    Some(Bands {
        lower: middle - k * std,
        middle,
        upper: middle + k * std,
    })
}

/// Technicals for `token`: supplied values win, missing ones are derived
pub fn technicals_for(token: &TokenCandidate, params: &MeanReversionParams) -> Option<Technicals> {
    let supplied = token.technicals.unwrap_or_default();
    let history = &token.price_history_sol;

    let rsi_value = supplied.rsi.or_else(|| rsi(history, params.rsi_period));
    let bands = if supplied.has_bands() {
        None
    } else {
        bollinger(history, params.bollinger_period, params.bollinger_k)
    };

    let technicals = Technicals {
        rsi: rsi_value,
        lower_band: supplied.lower_band.or(bands.map(|b| b.lower)),
        middle_band: supplied.middle_band.or(bands.map(|b| b.middle)),
        upper_band: supplied.upper_band.or(bands.map(|b| b.upper)),
    };

    technicals.rsi.map(|_| technicals)
}
