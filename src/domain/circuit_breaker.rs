//! Provider Circuit Breaker
//!
//! Per-provider failure tracking for the AI panel. After a run of
//! consecutive failures the provider is disabled for a fixed cooldown and is
//! skipped entirely (counted as absent) until the cooldown elapses.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default consecutive failures before the breaker opens
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Default cooldown once the breaker opens
pub const DEFAULT_COOLDOWN_SECS: i64 = 300;

/// Status of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitBreakerStatus {
    /// Calls allowed
    Closed,
    /// Calls skipped until the cooldown ends
    Open,
}

impl CircuitBreakerStatus {
    pub fn description(&self) -> &'static str {
        match self {
            CircuitBreakerStatus::Closed => "Provider healthy - calls allowed",
            CircuitBreakerStatus::Open => "Provider DISABLED - cooling down",
        }
    }
}

/// Snapshot for status reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub status: CircuitBreakerStatus,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub cooldown_remaining_secs: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    max_consecutive_failures: u32,
    cooldown: Duration,

    consecutive_failures: u32,
    total_failures: u64,
    total_successes: u64,
    /// Set while the breaker is open
    disabled_until: Option<DateTime<Utc>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_config(DEFAULT_MAX_CONSECUTIVE_FAILURES, Duration::seconds(DEFAULT_COOLDOWN_SECS))
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(max_consecutive_failures: u32, cooldown: Duration) -> Self {
        Self {
            max_consecutive_failures: max_consecutive_failures.max(1),
            cooldown,
            consecutive_failures: 0,
            total_failures: 0,
            total_successes: 0,
            disabled_until: None,
        }
    }

    /// Whether a call may be attempted at `now`. Closes an expired breaker.
    pub fn allow_call(&mut self, now: DateTime<Utc>) -> bool {
        match self.disabled_until {
            Some(until) if now < until => false,
            Some(_) => {
                tracing::info!("Provider cooldown complete, re-enabling");
                self.disabled_until = None;
                self.consecutive_failures = 0;
                true
            }
            None => true,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_successes += 1;
    }

    /// Record a failed call. Returns true if this failure opened the breaker.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.total_failures += 1;
        if self.disabled_until.is_some() {
            return false;
        }
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_consecutive_failures {
            self.disabled_until = Some(now + self.cooldown);
            tracing::warn!(
                "Circuit breaker OPEN: {} consecutive failures, disabled for {}s",
                self.consecutive_failures,
                self.cooldown.num_seconds()
            );
            return true;
        }
        false
    }

    pub fn status(&self, now: DateTime<Utc>) -> CircuitBreakerStatus {
        match self.disabled_until {
            Some(until) if now < until => CircuitBreakerStatus::Open,
            _ => CircuitBreakerStatus::Closed,
        }
    }

    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.disabled_until
            .filter(|until| now < *until)
            .map(|until| (until - now).num_seconds())
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn state(&self, now: DateTime<Utc>) -> CircuitBreakerState {
        CircuitBreakerState {
            status: self.status(now),
            consecutive_failures: self.consecutive_failures,
            total_failures: self.total_failures,
            total_successes: self.total_successes,
            cooldown_remaining_secs: self.cooldown_remaining(now),
        }
    }
}
