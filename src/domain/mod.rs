//! Domain Layer - Core decision logic for the GigaBrain engine
//!
//! Pure types and rules with no I/O. Everything that talks to the outside
//! world goes through the ports layer; time is always passed in.
//!
//! ## Pipeline
//!
//! - `discovery`: quality gate over market candidates
//! - `manipulation`: bundle/wash-trading screener feeding the blacklist
//! - `consensus`: AI vote aggregation
//! - `signal`: strategy signals and the intent merge policy
//! - `risk` / `portfolio`: sizing, reserve and the drawdown latch
//! - `lifecycle`: exit rules and rotation
//! - `journal` / `recalibration`: closed-trade stats and threshold regeneration
//! - `burn`: profit burn planning

pub mod blacklist;
pub mod burn;
pub mod circuit_breaker;
pub mod consensus;
pub mod discovery;
pub mod journal;
pub mod lifecycle;
pub mod manipulation;
pub mod portfolio;
pub mod position;
pub mod recalibration;
pub mod risk;
pub mod signal;
pub mod strategy_config;
pub mod token;

pub use blacklist::{AddedBy, Blacklist, BlacklistEntry, Severity};
pub use burn::{BurnIntent, BurnLedger, BurnPolicy, BurnPolicyError, BurnPolicyUpdate};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerState, CircuitBreakerStatus};
pub use consensus::{aggregate, AiVote, ConsensusResult};
pub use discovery::{check_candidate, filter_candidates, FilterRejection};
pub use journal::{JournalStats, TradeJournalEntry};
pub use lifecycle::{evaluate_exit, rotation_candidate, ExitDecision, ExitReason, LifecycleConfig, ModeLimits};
pub use manipulation::{ManipulationReason, ManipulationScore, ManipulationScreener, ScreenVerdict, ScreenerConfig};
pub use portfolio::{DrawdownBand, DrawdownTransition, PortfolioSnapshot, PortfolioState};
pub use position::{OpenRequest, Position, PositionError, PositionMode, Status};
pub use recalibration::{RecalibrationError, RecalibrationSettings, Recalibrator};
pub use risk::{RiskGovernor, RiskLimits, RiskRejection, SizedTrade};
pub use signal::{merge_intents, Action, SignalSource, StrategyId, StrategySignal, TradeIntent};
pub use strategy_config::{HivemindStrategyConfig, MarketSentiment, RiskLevel};
pub use token::{is_valid_address, Technicals, TokenCandidate};
