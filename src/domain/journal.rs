use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::lifecycle::ExitReason;
use super::position::{Position, PositionMode};
use super::signal::StrategyId;

/// Record of one closed position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeJournalEntry {
    pub position_id: String,
    pub owner_wallet: String,
    pub token_mint: String,
    pub strategy: StrategyId,
    pub mode: PositionMode,
    pub exit_reason: ExitReason,
    pub entry_sol: f64,
    pub exit_sol: f64,
    pub pnl_sol: f64,
    pub pnl_pct: f64,
    pub hold_duration_secs: i64,
    pub closed_at: DateTime<Utc>,
}

impl TradeJournalEntry {
    /// Build the entry for a just-closed position from its sale proceeds
    pub fn from_close(
        position: &Position,
        proceeds_sol: f64,
        exit_reason: ExitReason,
        closed_at: DateTime<Utc>,
    ) -> Self {
        let pnl_sol = proceeds_sol - position.amount_sol;
        let pnl_pct = if position.amount_sol > 0.0 {
            pnl_sol / position.amount_sol * 100.0
        } else {
            0.0
        };

        Self {
            position_id: position.id.clone(),
            owner_wallet: position.owner_wallet.clone(),
            token_mint: position.token_mint.clone(),
            strategy: position.strategy,
            mode: position.mode,
            exit_reason,
            entry_sol: position.amount_sol,
            exit_sol: proceeds_sol,
            pnl_sol,
            pnl_pct,
            hold_duration_secs: (closed_at - position.opened_at).num_seconds(),
            closed_at,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl_sol > 0.0
    }
}

/// Aggregate statistics over a window of journal entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalStats {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// 0.0 - 1.0
    pub win_rate: f64,
    pub avg_pnl_pct: f64,
    pub total_pnl_sol: f64,
}

impl JournalStats {
    pub fn from_entries(entries: &[TradeJournalEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        let wins = entries.iter().filter(|e| e.is_win()).count();
        let trades = entries.len();
        Self {
            trades,
            wins,
            losses: trades - wins,
            win_rate: wins as f64 / trades as f64,
            avg_pnl_pct: entries.iter().map(|e| e.pnl_pct).mean(),
            total_pnl_sol: entries.iter().map(|e| e.pnl_sol).sum(),
        }
    }
}
