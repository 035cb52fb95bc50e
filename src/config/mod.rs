//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, BaselineSection, Config, ConfigError, DataSection, EngineSection, ExecutionSection,
    HivemindSection, LoggingSection, RiskSection, SchedulerSection, WALLETS_ENV,
};
