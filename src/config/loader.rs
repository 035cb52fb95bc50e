//! Configuration Loader
//!
//! Loads and validates the engine configuration from a TOML file. Every
//! section is optional and falls back to the engine defaults; secrets
//! (API keys, wallet ids) come from the environment.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::adapters::ai::ProviderSettings;
use crate::domain::{
    BurnPolicy, DrawdownBand, HivemindStrategyConfig, LifecycleConfig, MarketSentiment, RecalibrationSettings,
    RiskLevel, RiskLimits, ScreenerConfig,
};
use crate::hivemind::HivemindConfig;
use crate::strategy::StrategyParams;

/// Environment variable listing wallets when `[engine].wallets` is empty
pub const WALLETS_ENV: &str = "GIGABRAIN_WALLETS";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSection,
    pub screener: ScreenerConfig,
    pub hivemind: HivemindSection,
    pub strategies: StrategyParams,
    pub risk: RiskSection,
    pub lifecycle: LifecycleConfig,
    pub recalibration: RecalibrationSettings,
    pub baseline: BaselineSection,
    pub scheduler: SchedulerSection,
    pub burn: BurnPolicy,
    pub data: DataSection,
    pub execution: ExecutionSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Wallets to run one bot each for
    pub wallets: Vec<String>,
    /// Prefix of the per-wallet key environment variable
    pub key_env_prefix: Option<String>,
    pub quick_scan_candidates: usize,
    pub deep_scan_candidates: usize,
    /// Closed trades considered by recalibration
    pub journal_window: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            wallets: Vec::new(),
            key_env_prefix: None,
            quick_scan_candidates: 5,
            deep_scan_candidates: 20,
            journal_window: 50,
        }
    }
}

impl EngineSection {
    /// Configured wallets, falling back to comma-separated `GIGABRAIN_WALLETS`
    pub fn resolve_wallets(&self) -> Vec<String> {
        if !self.wallets.is_empty() {
            return self.wallets.clone();
        }
        std::env::var(WALLETS_ENV)
            .map(|v| {
                v.split(',')
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HivemindSection {
    #[serde(flatten)]
    pub engine: HivemindConfig,
    pub providers: Vec<ProviderSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    #[serde(flatten)]
    pub limits: RiskLimits,
    pub drawdown: DrawdownBand,
}

/// Thresholds used until the first recalibration and as its template
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineSection {
    pub risk_level: RiskLevel,
    pub budget_per_trade_pct: f64,
    pub min_confidence: f64,
    pub min_volume_usd: f64,
    pub min_liquidity_usd: f64,
    pub min_organic_score: f64,
    pub min_quality_score: f64,
    pub min_age_hours: f64,
    pub min_holders: u64,
    pub max_daily_trades: u32,
    pub profit_target_multiplier: f64,
    pub stop_loss_multiplier: f64,
}

impl Default for BaselineSection {
    fn default() -> Self {
        let b = HivemindStrategyConfig::baseline(Utc::now());
        Self {
            risk_level: b.risk_level,
            budget_per_trade_pct: b.budget_per_trade_pct,
            min_confidence: b.min_confidence,
            min_volume_usd: b.min_volume_usd,
            min_liquidity_usd: b.min_liquidity_usd,
            min_organic_score: b.min_organic_score,
            min_quality_score: b.min_quality_score,
            min_age_hours: b.min_age_hours,
            min_holders: b.min_holders,
            max_daily_trades: b.max_daily_trades,
            profit_target_multiplier: b.profit_target_multiplier,
            stop_loss_multiplier: b.stop_loss_multiplier,
        }
    }
}

impl BaselineSection {
    pub fn to_strategy_config(&self, now: DateTime<Utc>, valid_for: Duration) -> HivemindStrategyConfig {
        HivemindStrategyConfig {
            market_sentiment: MarketSentiment::Neutral,
            risk_level: self.risk_level,
            budget_per_trade_pct: self.budget_per_trade_pct,
            min_confidence: self.min_confidence,
            min_volume_usd: self.min_volume_usd,
            min_liquidity_usd: self.min_liquidity_usd,
            min_organic_score: self.min_organic_score,
            min_quality_score: self.min_quality_score,
            min_age_hours: self.min_age_hours,
            min_holders: self.min_holders,
            max_daily_trades: self.max_daily_trades,
            profit_target_multiplier: self.profit_target_multiplier,
            stop_loss_multiplier: self.stop_loss_multiplier,
            generated_at: now,
            valid_until: now + valid_for,
        }
    }
}

/// Timer periods in seconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub quick_scan_secs: u64,
    pub deep_scan_secs: u64,
    pub monitor_secs: u64,
    pub rebalance_secs: u64,
    pub recalibration_secs: u64,
    /// Upper bound of the random delay before each timer's first tick
    pub start_jitter_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            quick_scan_secs: 5 * 60,
            deep_scan_secs: 15 * 60,
            monitor_secs: 60,
            rebalance_secs: 30 * 60,
            recalibration_secs: 3 * 60 * 60,
            start_jitter_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// Snapshot file path or http(s) URL
    pub snapshot: String,
    /// Root directory of the JSON store; empty means in-memory
    pub store_dir: String,
    /// Drop snapshot entries whose mint is not a valid address
    pub strict_mints: bool,
    pub http_timeout_secs: u64,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            snapshot: "data/snapshot.json".to_string(),
            store_dir: "~/.gigabrain".to_string(),
            strict_mints: false,
            http_timeout_secs: 10,
        }
    }
}

impl DataSection {
    /// `~` and `$VAR` expanded store root, `None` for the in-memory store
    pub fn store_path(&self) -> Result<Option<PathBuf>, ConfigError> {
        if self.store_dir.trim().is_empty() {
            return Ok(None);
        }
        expand_path(&self.store_dir).map(Some)
    }

    /// Snapshot location with paths expanded and URLs untouched
    pub fn snapshot_location(&self) -> Result<String, ConfigError> {
        if self.snapshot.starts_with("http://") || self.snapshot.starts_with("https://") {
            return Ok(self.snapshot.clone());
        }
        Ok(expand_path(&self.snapshot)?.display().to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub slippage_bps: u16,
    /// Floor slippage applied to every paper fill
    pub paper_base_slippage_bps: u16,
    /// Starting SOL balance of each paper wallet
    pub initial_cash_sol: f64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            slippage_bps: 100,
            paper_base_slippage_bps: 10,
            initial_cash_sol: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// "trace", "debug", "info", "warn" or "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSection {
    /// Normalised filter directive, `None` when the level is unknown
    pub fn directive(&self) -> Option<&'static str> {
        tracing_level(&self.level)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

fn expand_path(raw: &str) -> Result<PathBuf, ConfigError> {
    shellexpand::full(raw)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| ConfigError::ValidationError(format!("cannot expand path {}: {}", raw, e)))
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |section: &str, msg: String| ConfigError::ValidationError(format!("[{}] {}", section, msg));

        if self.screener.critical_threshold < self.screener.suspicious_threshold {
            return Err(invalid(
                "screener",
                format!(
                    "critical_threshold {} below suspicious_threshold {}",
                    self.screener.critical_threshold, self.screener.suspicious_threshold
                ),
            ));
        }

        if self.engine.quick_scan_candidates == 0 || self.engine.deep_scan_candidates == 0 {
            return Err(invalid("engine", "scan candidate limits must be at least 1".to_string()));
        }
        if self.engine.journal_window == 0 {
            return Err(invalid("engine", "journal_window must be at least 1".to_string()));
        }

        self.hivemind.engine.validate().map_err(|e| invalid("hivemind", e))?;
        let mut ids = std::collections::HashSet::new();
        for provider in &self.hivemind.providers {
            if provider.id.is_empty() || !ids.insert(provider.id.as_str()) {
                return Err(invalid("hivemind", format!("duplicate or empty provider id '{}'", provider.id)));
            }
            if provider.base_url.is_empty() {
                return Err(invalid("hivemind", format!("provider {} has no base_url", provider.id)));
            }
        }

        self.strategies.validate().map_err(|e| invalid("strategies", e.to_string()))?;
        self.risk.limits.validate().map_err(|e| invalid("risk", e))?;
        if self.risk.drawdown.resume_pct >= self.risk.drawdown.pause_pct {
            return Err(invalid(
                "risk",
                format!(
                    "drawdown resume_pct {} must be below pause_pct {}",
                    self.risk.drawdown.resume_pct, self.risk.drawdown.pause_pct
                ),
            ));
        }
        self.lifecycle.validate().map_err(|e| invalid("lifecycle", e))?;

        if self.recalibration.interval_minutes <= 0 {
            return Err(invalid("recalibration", "interval_minutes must be > 0".to_string()));
        }
        self.baseline
            .to_strategy_config(Utc::now(), Duration::minutes(self.recalibration.interval_minutes))
            .validate()
            .map_err(|e| invalid("baseline", e))?;

        let s = &self.scheduler;
        if [s.quick_scan_secs, s.deep_scan_secs, s.monitor_secs, s.rebalance_secs, s.recalibration_secs].contains(&0) {
            return Err(invalid("scheduler", "intervals must be > 0".to_string()));
        }

        self.burn.validate().map_err(|e| invalid("burn", e.to_string()))?;

        if self.data.snapshot.is_empty() {
            return Err(invalid("data", "snapshot cannot be empty".to_string()));
        }
        if self.execution.slippage_bps > 5_000 {
            return Err(invalid(
                "execution",
                format!("slippage_bps must be <= 5000, got {}", self.execution.slippage_bps),
            ));
        }
        if !(self.execution.initial_cash_sol >= 0.0) {
            return Err(invalid("execution", "initial_cash_sol must be non-negative".to_string()));
        }

        if tracing_level(&self.logging.level).is_none() {
            return Err(invalid("logging", format!("unknown level '{}'", self.logging.level)));
        }

        Ok(())
    }

    /// Starting strategy config derived from `[baseline]`
    pub fn baseline_strategy(&self, now: DateTime<Utc>) -> HivemindStrategyConfig {
        self.baseline
            .to_strategy_config(now, Duration::minutes(self.recalibration.interval_minutes))
    }
}

fn tracing_level(level: &str) -> Option<&'static str> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}
