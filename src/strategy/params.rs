//! Strategy Parameters
//!
//! Thresholds for the three deterministic strategies. Defaults are the
//! production values; every field can be overridden from `[strategies]`.

use serde::{Deserialize, Serialize};

/// Parameters for every deterministic strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub mean_reversion: MeanReversionParams,
    pub momentum: MomentumParams,
    pub grid: GridParams,
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        self.mean_reversion.validate()?;
        self.momentum.validate()?;
        self.grid.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionParams {
    pub enabled: bool,
    pub rsi_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    /// Price must sit within this percent of the relevant band
    pub band_tolerance_pct: f64,
    pub base_confidence: f64,
    /// Added when band data confirms the RSI reading
    pub band_bonus: f64,
    /// Subtracted when only RSI is available
    pub rsi_only_penalty: f64,
    pub max_confidence: f64,
    pub position_size_pct: f64,
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for MeanReversionParams {
    fn default() -> Self {
        Self {
            enabled: true,
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
            bollinger_period: 20,
            bollinger_k: 2.0,
            band_tolerance_pct: 15.0,
            base_confidence: 60.0,
            band_bonus: 10.0,
            rsi_only_penalty: 15.0,
            max_confidence: 95.0,
            position_size_pct: 10.0,
            profit_target_pct: 15.0,
            stop_loss_pct: 10.0,
        }
    }
}

impl MeanReversionParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.rsi_period < 2 {
            return Err(ParamError::InvalidPeriod("rsi_period", self.rsi_period));
        }
        if self.bollinger_period < 2 {
            return Err(ParamError::InvalidPeriod("bollinger_period", self.bollinger_period));
        }
        if !(0.0 < self.oversold && self.oversold < self.overbought && self.overbought < 100.0) {
            return Err(ParamError::InvalidRsiBounds(self.oversold, self.overbought));
        }
        if self.max_confidence > 100.0 {
            return Err(ParamError::InvalidConfidence(self.max_confidence));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub enabled: bool,
    /// Minimum 1h change (percent) for a breakout
    pub min_change_1h_pct: f64,
    pub volume_baseline_usd: f64,
    pub volume_multiplier: f64,
    /// 24h change at or above this is treated as an exhausted pump
    pub max_change_24h_pct: f64,
    /// Peak profit needed before the trailing stop arms
    pub trailing_activation_pct: f64,
    /// 1h change at or below this closes an open position
    pub reversal_change_1h_pct: f64,
    pub base_confidence: f64,
    pub max_confidence: f64,
    pub position_size_pct: f64,
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_change_1h_pct: 5.0,
            volume_baseline_usd: 100_000.0,
            volume_multiplier: 2.0,
            max_change_24h_pct: 30.0,
            trailing_activation_pct: 15.0,
            reversal_change_1h_pct: -5.0,
            base_confidence: 60.0,
            max_confidence: 90.0,
            position_size_pct: 8.0,
            profit_target_pct: 25.0,
            stop_loss_pct: 12.0,
        }
    }
}

impl MomentumParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.min_change_1h_pct <= 0.0 {
            return Err(ParamError::InvalidThreshold("min_change_1h_pct", self.min_change_1h_pct));
        }
        if self.volume_multiplier <= 0.0 {
            return Err(ParamError::InvalidThreshold("volume_multiplier", self.volume_multiplier));
        }
        if self.reversal_change_1h_pct >= 0.0 {
            return Err(ParamError::InvalidThreshold(
                "reversal_change_1h_pct",
                self.reversal_change_1h_pct,
            ));
        }
        if self.max_confidence > 100.0 {
            return Err(ParamError::InvalidConfidence(self.max_confidence));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub enabled: bool,
    /// Ranging requires |1h| below this
    pub range_change_1h_pct: f64,
    /// Ranging requires |24h| below this
    pub range_change_24h_pct: f64,
    /// Shallowest 1h dip that buys (negative)
    pub dip_min_pct: f64,
    /// Deepest 1h dip that buys (negative)
    pub dip_max_pct: f64,
    /// Profit increment that sells
    pub grid_step_pct: f64,
    pub base_confidence: f64,
    pub position_size_pct: f64,
    pub stop_loss_pct: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            enabled: true,
            range_change_1h_pct: 5.0,
            range_change_24h_pct: 15.0,
            dip_min_pct: -2.0,
            dip_max_pct: -8.0,
            grid_step_pct: 3.0,
            base_confidence: 55.0,
            position_size_pct: 5.0,
            stop_loss_pct: 6.0,
        }
    }
}

impl GridParams {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.dip_max_pct < self.dip_min_pct && self.dip_min_pct < 0.0) {
            return Err(ParamError::InvalidDipRange(self.dip_max_pct, self.dip_min_pct));
        }
        if self.grid_step_pct <= 0.0 {
            return Err(ParamError::InvalidThreshold("grid_step_pct", self.grid_step_pct));
        }
        Ok(())
    }
}

/// Parameter validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("Invalid {0}: {1} (minimum 2)")]
    InvalidPeriod(&'static str, usize),
    #[error("Invalid RSI bounds: oversold {0}, overbought {1}")]
    InvalidRsiBounds(f64, f64),
    #[error("Invalid confidence cap: {0}")]
    InvalidConfidence(f64),
    #[error("Invalid {0}: {1}")]
    InvalidThreshold(&'static str, f64),
    #[error("Invalid dip range: [{0}, {1}] (deepest must be below shallowest, both negative)")]
    InvalidDipRange(f64, f64),
}
