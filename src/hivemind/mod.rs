//! Hivemind - multi-provider AI consensus with per-provider failover

pub mod engine;

pub use engine::{Hivemind, HivemindConfig, ProviderStatus, ScanDepth};
