//! Engine events published on a broadcast channel

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::{
    BlacklistEntry, BurnIntent, ExitReason, HivemindStrategyConfig, Position, TradeJournalEntry,
};

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    PositionOpened {
        position: Position,
        signature: String,
    },
    PositionClosed {
        entry: TradeJournalEntry,
        reason: ExitReason,
        signature: String,
    },
    Blacklisted {
        wallet: String,
        entry: BlacklistEntry,
    },
    BurnPlanned(BurnIntent),
    DrawdownPaused {
        wallet: String,
        drawdown_pct: f64,
        at: DateTime<Utc>,
    },
    DrawdownResumed {
        wallet: String,
        drawdown_pct: f64,
        at: DateTime<Utc>,
    },
    ConfigRecalibrated {
        wallet: String,
        config: HivemindStrategyConfig,
    },
}

impl EngineEvent {
    /// Short label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::PositionOpened { .. } => "position_opened",
            EngineEvent::PositionClosed { .. } => "position_closed",
            EngineEvent::Blacklisted { .. } => "blacklisted",
            EngineEvent::BurnPlanned(_) => "burn_planned",
            EngineEvent::DrawdownPaused { .. } => "drawdown_paused",
            EngineEvent::DrawdownResumed { .. } => "drawdown_resumed",
            EngineEvent::ConfigRecalibrated { .. } => "config_recalibrated",
        }
    }
}

/// Sender side shared by every bot
pub fn event_channel() -> (broadcast::Sender<EngineEvent>, broadcast::Receiver<EngineEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}
