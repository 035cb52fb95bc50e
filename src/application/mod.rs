//! Application Layer - Per-wallet bots and their timers
//!
//! - `bot`: one decision engine per wallet (scan, monitor, rebalance, recalibrate)
//! - `scheduler`: periodic cycle timers with start jitter and graceful shutdown
//! - `registry`: the set of running bots
//! - `events`: notifications broadcast to subscribers

pub mod bot;
pub mod events;
pub mod registry;
pub mod scheduler;

pub use bot::{BotDeps, BotSettings, BotStatus, EngineError, MonitorReport, RebalanceReport, ScanReport, WalletBot};
pub use events::{event_channel, EngineEvent, EVENT_CHANNEL_CAPACITY};
pub use registry::BotRegistry;
pub use scheduler::{run_cycle, Cycle, SchedulerHandle};
