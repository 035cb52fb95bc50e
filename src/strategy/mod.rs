//! Strategy Layer - Deterministic quantitative strategies
//!
//! Three independent strategies evaluated on every candidate:
//! - `MeanReversionStrategy`: RSI extremes confirmed by Bollinger bands
//! - `MomentumBreakoutStrategy`: fresh 1h breakouts with trailing/reversal exits
//! - `GridTradingStrategy`: dip buying in ranging markets
//!
//! `StrategyEvaluator` keeps the single best signal for the current state.

pub mod evaluator;
pub mod grid_trading;
pub mod indicators;
pub mod mean_reversion;
pub mod momentum_breakout;
pub mod params;

pub use evaluator::StrategyEvaluator;
pub use grid_trading::GridTradingStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum_breakout::MomentumBreakoutStrategy;
pub use params::{GridParams, MeanReversionParams, MomentumParams, ParamError, StrategyParams};
