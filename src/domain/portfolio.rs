use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::position::Position;

/// Default drawdown from peak that pauses new buys
pub const DEFAULT_PAUSE_DRAWDOWN_PCT: f64 = 20.0;
/// Default drawdown from peak under which buying resumes
pub const DEFAULT_RESUME_DRAWDOWN_PCT: f64 = 15.0;

/// Change of the drawdown latch produced by a revaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawdownTransition {
    Paused,
    Resumed,
}

/// Hysteresis band for the drawdown latch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawdownBand {
    pub pause_pct: f64,
    pub resume_pct: f64,
}

impl Default for DrawdownBand {
    fn default() -> Self {
        Self {
            pause_pct: DEFAULT_PAUSE_DRAWDOWN_PCT,
            resume_pct: DEFAULT_RESUME_DRAWDOWN_PCT,
        }
    }
}

/// Per-wallet portfolio: free SOL plus open positions keyed by mint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioState {
    pub owner_wallet: String,
    pub cash_sol: f64,
    pub total_value_sol: f64,
    pub peak_value_sol: f64,
    pub drawdown_paused: bool,
    pub open_positions: HashMap<String, Position>,
    pub trades_today: u32,
    pub trading_day: Option<NaiveDate>,
}

/// Durable part of a portfolio. Positions are persisted separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash_sol: f64,
    pub peak_value_sol: f64,
    pub drawdown_paused: bool,
    pub trades_today: u32,
    pub trading_day: Option<NaiveDate>,
    pub saved_at: DateTime<Utc>,
}

impl PortfolioState {
    pub fn new(owner_wallet: impl Into<String>, cash_sol: f64) -> Self {
        Self {
            owner_wallet: owner_wallet.into(),
            cash_sol,
            total_value_sol: cash_sol,
            peak_value_sol: cash_sol,
            drawdown_paused: false,
            open_positions: HashMap::new(),
            trades_today: 0,
            trading_day: None,
        }
    }

    /// Rebuild from a snapshot and the still-open positions. Cash in the
    /// snapshot already excludes what those positions cost.
    pub fn restore(owner_wallet: impl Into<String>, snapshot: &PortfolioSnapshot, positions: Vec<Position>) -> Self {
        let mut state = Self::new(owner_wallet, snapshot.cash_sol);
        state.peak_value_sol = snapshot.peak_value_sol;
        state.drawdown_paused = snapshot.drawdown_paused;
        state.trades_today = snapshot.trades_today;
        state.trading_day = snapshot.trading_day;
        state.open_positions = positions.into_iter().map(|p| (p.token_mint.clone(), p)).collect();
        state.total_value_sol = state.cash_sol + state.positions_value_sol();
        state
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> PortfolioSnapshot {
        PortfolioSnapshot {
            cash_sol: self.cash_sol,
            peak_value_sol: self.peak_value_sol,
            drawdown_paused: self.drawdown_paused,
            trades_today: self.trades_today,
            trading_day: self.trading_day,
            saved_at: now,
        }
    }

    pub fn has_position(&self, mint: &str) -> bool {
        self.open_positions.contains_key(mint)
    }

    pub fn position_count(&self) -> usize {
        self.open_positions.len()
    }

    pub fn positions_value_sol(&self) -> f64 {
        self.open_positions.values().map(Position::current_value_sol).sum()
    }

    /// Percent below the peak value
    pub fn drawdown_pct(&self) -> f64 {
        if self.peak_value_sol <= 0.0 {
            return 0.0;
        }
        ((self.peak_value_sol - self.total_value_sol) / self.peak_value_sol * 100.0).max(0.0)
    }

    /// Recompute total value, raise the peak and step the drawdown latch.
    ///
    /// The latch pauses at `pause_pct` below peak and only releases once the
    /// drawdown is back within `resume_pct`; values in between keep the
    /// previous state.
    pub fn revalue(&mut self, band: DrawdownBand) -> Option<DrawdownTransition> {
        self.total_value_sol = self.cash_sol + self.positions_value_sol();
        if self.total_value_sol > self.peak_value_sol {
            self.peak_value_sol = self.total_value_sol;
        }

        let drawdown = self.drawdown_pct();
        if !self.drawdown_paused && drawdown >= band.pause_pct {
            self.drawdown_paused = true;
            tracing::warn!(
                "Drawdown {:.1}% >= {:.1}%, pausing buys for {}",
                drawdown,
                band.pause_pct,
                self.owner_wallet
            );
            return Some(DrawdownTransition::Paused);
        }
        if self.drawdown_paused && drawdown <= band.resume_pct {
            self.drawdown_paused = false;
            tracing::info!(
                "Drawdown recovered to {:.1}%, resuming buys for {}",
                drawdown,
                self.owner_wallet
            );
            return Some(DrawdownTransition::Resumed);
        }
        None
    }

    /// Reset the daily trade counter when the UTC day rolls over
    pub fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.trading_day != Some(today) {
            self.trading_day = Some(today);
            self.trades_today = 0;
        }
    }

    pub fn record_trade(&mut self, now: DateTime<Utc>) {
        self.roll_day(now);
        self.trades_today += 1;
    }

    /// Book an opened position
    pub fn add_position(&mut self, position: Position) {
        self.cash_sol -= position.amount_sol;
        self.open_positions.insert(position.token_mint.clone(), position);
    }

    /// Remove a position and credit the sale proceeds
    pub fn remove_position(&mut self, mint: &str, proceeds_sol: f64) -> Option<Position> {
        let position = self.open_positions.remove(mint)?;
        self.cash_sol += proceeds_sol;
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{OpenRequest, PositionMode};
    use crate::domain::signal::StrategyId;
    use chrono::TimeZone;

    fn position(mint: &str, amount: f64) -> Position {
        Position::open(
            OpenRequest {
                owner_wallet: "w".into(),
                token_mint: mint.into(),
                symbol: "TKN".into(),
                entry_price_sol: 1.0,
                amount_sol: amount,
                token_amount: amount,
                strategy: StrategyId::GridTrading,
                confidence_at_entry: 0.6,
                profit_target_pct: 5.0,
                stop_loss_pct: 10.0,
                mode: PositionMode::Scalp,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_drawdown_hysteresis_no_flapping() {
        let band = DrawdownBand::default();
        let mut portfolio = PortfolioState::new("w", 10.0);

        portfolio.cash_sol = 8.2;
        assert_eq!(portfolio.revalue(band), None);
        assert!(!portfolio.drawdown_paused);

        portfolio.cash_sol = 7.9;
        assert_eq!(portfolio.revalue(band), Some(DrawdownTransition::Paused));
        assert!(portfolio.drawdown_paused);

        // -18% sits inside the band: stays paused
        portfolio.cash_sol = 8.2;
        assert_eq!(portfolio.revalue(band), None);
        assert!(portfolio.drawdown_paused);

        portfolio.cash_sol = 8.6;
        assert_eq!(portfolio.revalue(band), Some(DrawdownTransition::Resumed));
        assert!(!portfolio.drawdown_paused);

        // -18% again from the unpaused side: stays unpaused
        portfolio.cash_sol = 8.2;
        assert_eq!(portfolio.revalue(band), None);
        assert!(!portfolio.drawdown_paused);
    }

    #[test]
    fn test_peak_only_rises() {
        let mut portfolio = PortfolioState::new("w", 10.0);
        portfolio.cash_sol = 12.0;
        portfolio.revalue(DrawdownBand::default());
        portfolio.cash_sol = 11.0;
        portfolio.revalue(DrawdownBand::default());
        assert_eq!(portfolio.peak_value_sol, 12.0);
    }

    #[test]
    fn test_restore_keeps_peak_and_latch() {
        let band = DrawdownBand::default();
        let mut portfolio = PortfolioState::new("w", 10.0);
        portfolio.add_position(position("m1", 2.0));
        portfolio.cash_sol -= 2.5;
        assert_eq!(portfolio.revalue(band), Some(DrawdownTransition::Paused));

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let snapshot = portfolio.snapshot(now);
        let positions: Vec<Position> = portfolio.open_positions.values().cloned().collect();

        let mut restored = PortfolioState::restore("w", &snapshot, positions);
        assert!((restored.cash_sol - 5.5).abs() < 1e-9);
        assert!((restored.total_value_sol - 7.5).abs() < 1e-9);
        assert_eq!(restored.peak_value_sol, 10.0);
        assert!(restored.drawdown_paused);
        // still -25%: no transition
        assert_eq!(restored.revalue(band), None);
        assert!(restored.drawdown_paused);
    }

    #[test]
    fn test_add_and_remove_position() {
        let mut portfolio = PortfolioState::new("w", 10.0);
        portfolio.add_position(position("m1", 1.5));
        assert!(portfolio.has_position("m1"));
        assert!((portfolio.cash_sol - 8.5).abs() < 1e-9);

        portfolio.revalue(DrawdownBand::default());
        assert!((portfolio.total_value_sol - 10.0).abs() < 1e-9);

        let removed = portfolio.remove_position("m1", 1.8).unwrap();
        assert_eq!(removed.token_mint, "m1");
        assert!((portfolio.cash_sol - 10.3).abs() < 1e-9);
        assert!(portfolio.remove_position("m1", 1.0).is_none());
    }

    #[test]
    fn test_daily_counter_rolls_over() {
        let mut portfolio = PortfolioState::new("w", 10.0);
        let day1 = Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap();
        portfolio.record_trade(day1);
        portfolio.record_trade(day1);
        assert_eq!(portfolio.trades_today, 2);

        let day2 = Utc.with_ymd_and_hms(2026, 3, 2, 0, 30, 0).unwrap();
        portfolio.roll_day(day2);
        assert_eq!(portfolio.trades_today, 0);
    }
}
