use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::signal::StrategyId;

/// Holding style; each mode has its own target, stop and hold-time band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionMode {
    Scalp,
    Swing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub owner_wallet: String,
    pub token_mint: String,
    pub symbol: String,
    pub entry_price_sol: f64,
    pub amount_sol: f64,
    pub token_amount: f64,
    pub strategy: StrategyId,
    /// Confidence at entry, 0.0 - 1.0
    pub confidence_at_entry: f64,
    pub profit_target_pct: f64,
    /// Positive number: 10.0 means exit at -10%
    pub stop_loss_pct: f64,
    pub mode: PositionMode,
    pub opened_at: DateTime<Utc>,
    /// High-water mark of unrealised profit percent
    pub peak_profit_pct: f64,
    pub last_price_sol: f64,
    pub status: Status,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Position is already closed")]
    AlreadyClosed,
    #[error("Position already open for {0}")]
    AlreadyOpen(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("Invalid entry price: {0}")]
    InvalidEntryPrice(f64),
}

/// Everything needed to open a position
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub owner_wallet: String,
    pub token_mint: String,
    pub symbol: String,
    pub entry_price_sol: f64,
    pub amount_sol: f64,
    pub token_amount: f64,
    pub strategy: StrategyId,
    pub confidence_at_entry: f64,
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub mode: PositionMode,
}

impl Position {
    pub fn open(request: OpenRequest, now: DateTime<Utc>) -> Result<Self, PositionError> {
        if !(request.amount_sol > 0.0) {
            return Err(PositionError::InvalidAmount(request.amount_sol));
        }
        if !(request.entry_price_sol > 0.0) {
            return Err(PositionError::InvalidEntryPrice(request.entry_price_sol));
        }

        Ok(Self {
            id: format!("{}-{}", &request.token_mint, now.timestamp_millis()),
            owner_wallet: request.owner_wallet,
            token_mint: request.token_mint,
            symbol: request.symbol,
            entry_price_sol: request.entry_price_sol,
            amount_sol: request.amount_sol,
            token_amount: request.token_amount,
            strategy: request.strategy,
            confidence_at_entry: request.confidence_at_entry,
            profit_target_pct: request.profit_target_pct,
            stop_loss_pct: request.stop_loss_pct,
            mode: request.mode,
            opened_at: now,
            peak_profit_pct: 0.0,
            last_price_sol: request.entry_price_sol,
            status: Status::Open,
            closed_at: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }

    /// Unrealised P/L percent at `price`
    pub fn pnl_pct(&self, price_sol: f64) -> f64 {
        if self.entry_price_sol <= 0.0 {
            return 0.0;
        }
        (price_sol - self.entry_price_sol) / self.entry_price_sol * 100.0
    }

    /// Mark-to-market value in SOL
    pub fn value_sol(&self, price_sol: f64) -> f64 {
        self.amount_sol * price_sol / self.entry_price_sol
    }

    pub fn current_value_sol(&self) -> f64 {
        self.value_sol(self.last_price_sol)
    }

    pub fn current_pnl_pct(&self) -> f64 {
        self.pnl_pct(self.last_price_sol)
    }

    pub fn held_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.opened_at
    }

    /// Record a new price and refresh the peak profit high-water mark
    pub fn mark(&mut self, price_sol: f64) -> Result<(), PositionError> {
        if self.status != Status::Open {
            return Err(PositionError::AlreadyClosed);
        }
        if price_sol > 0.0 {
            self.last_price_sol = price_sol;
            let pnl = self.pnl_pct(price_sol);
            if pnl > self.peak_profit_pct {
                self.peak_profit_pct = pnl;
            }
        }
        Ok(())
    }

    /// OPEN -> CLOSED. Fails if already closed.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), PositionError> {
        if self.status != Status::Open {
            return Err(PositionError::AlreadyClosed);
        }
        self.status = Status::Closed;
        self.closed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn request(amount_sol: f64, entry: f64) -> OpenRequest {
        OpenRequest {
            owner_wallet: "wallet".into(),
            token_mint: "mint".into(),
            symbol: "TKN".into(),
            entry_price_sol: entry,
            amount_sol,
            token_amount: amount_sol / entry,
            strategy: StrategyId::MomentumBreakout,
            confidence_at_entry: 0.7,
            profit_target_pct: 20.0,
            stop_loss_pct: 10.0,
            mode: PositionMode::Scalp,
        }
    }

    #[test]
    fn test_open_position() {
        let now = Utc::now();
        let position = Position::open(request(1.0, 0.001), now).unwrap();
        assert!(position.is_open());
        assert_eq!(position.peak_profit_pct, 0.0);
        assert_eq!(position.opened_at, now);
    }

    #[test]
    fn test_open_invalid_amount() {
        let result = Position::open(request(0.0, 0.001), Utc::now());
        assert!(matches!(result, Err(PositionError::InvalidAmount(_))));
    }

    #[test]
    fn test_open_invalid_price() {
        let result = Position::open(request(1.0, 0.0), Utc::now());
        assert!(matches!(result, Err(PositionError::InvalidEntryPrice(_))));
    }

    #[test]
    fn test_mark_tracks_peak() {
        let mut position = Position::open(request(1.0, 1.0), Utc::now()).unwrap();
        position.mark(1.3).unwrap();
        position.mark(1.1).unwrap();
        assert!((position.peak_profit_pct - 30.0).abs() < 1e-9);
        assert!((position.current_pnl_pct() - 10.0).abs() < 1e-9);
        assert!((position.current_value_sol() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_close_exactly_once() {
        let now = Utc::now();
        let mut position = Position::open(request(1.0, 1.0), now).unwrap();
        position.close(now).unwrap();
        assert_eq!(position.status, Status::Closed);
        assert!(matches!(position.close(now), Err(PositionError::AlreadyClosed)));
        assert!(matches!(position.mark(2.0), Err(PositionError::AlreadyClosed)));
    }
}
