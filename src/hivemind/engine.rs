//! AI Consensus Engine
//!
//! Fans a candidate out to a priority-ordered panel of providers, each
//! guarded by its own circuit breaker, and folds the answers into a
//! [`ConsensusResult`]. Calls run with bounded parallelism, a per-call
//! timeout and a cycle deadline; answers arriving after the deadline are
//! dropped and counted absent.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::domain::{aggregate, AiVote, CircuitBreaker, CircuitBreakerState, ConsensusResult, TokenCandidate};
use crate::ports::{AiProvider, ProviderError, ProviderTier};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HivemindConfig {
    pub min_quorum: usize,
    /// Providers asked during a quick scan
    pub quick_scan_top_k: usize,
    pub call_timeout_ms: u64,
    pub cycle_timeout_ms: u64,
    pub max_concurrent_calls: usize,
    pub breaker_max_failures: u32,
    pub breaker_cooldown_secs: i64,
}

impl Default for HivemindConfig {
    fn default() -> Self {
        Self {
            min_quorum: 2,
            quick_scan_top_k: 4,
            call_timeout_ms: 8_000,
            cycle_timeout_ms: 20_000,
            max_concurrent_calls: 4,
            breaker_max_failures: 3,
            breaker_cooldown_secs: 300,
        }
    }
}

impl HivemindConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_quorum == 0 {
            return Err("min_quorum must be at least 1".to_string());
        }
        if self.quick_scan_top_k == 0 {
            return Err("quick_scan_top_k must be at least 1".to_string());
        }
        if self.call_timeout_ms == 0 || self.cycle_timeout_ms == 0 {
            return Err("timeouts must be positive".to_string());
        }
        if self.max_concurrent_calls == 0 {
            return Err("max_concurrent_calls must be at least 1".to_string());
        }
        Ok(())
    }
}

/// How many providers to consult
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDepth {
    /// Top-K eligible providers by priority
    Quick,
    /// Every eligible provider
    Deep,
}

struct ProviderSlot {
    provider: Arc<dyn AiProvider>,
    breaker: Mutex<CircuitBreaker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub id: String,
    pub tier: ProviderTier,
    pub priority: u32,
    pub breaker: CircuitBreakerState,
}

pub struct Hivemind {
    config: HivemindConfig,
    slots: Vec<ProviderSlot>,
}

impl Hivemind {
    pub fn new(config: HivemindConfig, mut providers: Vec<Arc<dyn AiProvider>>) -> Self {
        providers.sort_by_key(|p| (p.priority(), p.tier()));
        let cooldown = ChronoDuration::seconds(config.breaker_cooldown_secs);
        let slots = providers
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                breaker: Mutex::new(CircuitBreaker::with_config(config.breaker_max_failures, cooldown)),
            })
            .collect();
        Self { config, slots }
    }

    pub fn config(&self) -> &HivemindConfig {
        &self.config
    }

    pub fn provider_count(&self) -> usize {
        self.slots.len()
    }

    pub async fn provider_status(&self, now: DateTime<Utc>) -> Vec<ProviderStatus> {
        let mut out = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            out.push(ProviderStatus {
                id: slot.provider.id().to_string(),
                tier: slot.provider.tier(),
                priority: slot.provider.priority(),
                breaker: slot.breaker.lock().await.state(now),
            });
        }
        out
    }

    /// Pick providers for this cycle. Returns slot indices and the number
    /// skipped because their breaker is open.
    async fn select(&self, depth: ScanDepth, now: DateTime<Utc>) -> (Vec<usize>, usize) {
        let limit = match depth {
            ScanDepth::Quick => self.config.quick_scan_top_k,
            ScanDepth::Deep => self.slots.len(),
        };

        let mut selected = Vec::new();
        let mut skipped = 0;
        for (idx, slot) in self.slots.iter().enumerate() {
            if selected.len() >= limit {
                break;
            }
            if slot.breaker.lock().await.allow_call(now) {
                selected.push(idx);
            } else {
                tracing::debug!("Skipping {}: breaker open", slot.provider.id());
                skipped += 1;
            }
        }
        (selected, skipped)
    }

    /// Consult the panel about `candidate`
    pub async fn consult(
        &self,
        candidate: &TokenCandidate,
        risk_tolerance: f64,
        budget_sol: f64,
        depth: ScanDepth,
        now: DateTime<Utc>,
    ) -> ConsensusResult {
        let (selected, mut absent) = self.select(depth, now).await;
        if selected.is_empty() {
            tracing::warn!("No AI providers eligible for {} ({} cooling down)", candidate.symbol, absent);
            return ConsensusResult::empty(absent);
        }

        let call_timeout = Duration::from_millis(self.config.call_timeout_ms);
        let requested = selected.len();

        let mut calls = stream::iter(selected.into_iter().map(|idx| {
            let provider = Arc::clone(&self.slots[idx].provider);
            async move {
                let started = Instant::now();
                let result = tokio::time::timeout(
                    call_timeout,
                    provider.analyze(candidate, risk_tolerance, budget_sol),
                )
                .await
                .unwrap_or(Err(ProviderError::Timeout(call_timeout.as_millis() as u64)));
                (idx, started.elapsed().as_millis() as u64, result)
            }
        }))
        .buffer_unordered(self.config.max_concurrent_calls.max(1));

        let deadline = tokio::time::Instant::now() + Duration::from_millis(self.config.cycle_timeout_ms);
        let mut votes = Vec::with_capacity(requested);
        loop {
            match tokio::time::timeout_at(deadline, calls.next()).await {
                Ok(Some((idx, latency_ms, result))) => {
                    votes.push(self.record(idx, latency_ms, result, now).await);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Hivemind cycle deadline hit for {}: {}/{} answers in",
                        candidate.symbol,
                        votes.len(),
                        requested
                    );
                    break;
                }
            }
        }
        absent += requested - votes.len();

        let result = aggregate(votes, absent, self.config.min_quorum);
        tracing::debug!(
            "Consensus for {}: {} {:.0}% ({} votes, {} absent, actionable={})",
            candidate.symbol,
            result.action,
            result.confidence * 100.0,
            result.vote_count,
            result.absent,
            result.actionable
        );
        result
    }

    async fn record(
        &self,
        idx: usize,
        latency_ms: u64,
        result: Result<AiVote, ProviderError>,
        now: DateTime<Utc>,
    ) -> AiVote {
        let slot = &self.slots[idx];
        let id = slot.provider.id();
        let mut breaker = slot.breaker.lock().await;

        match result {
            Ok(mut vote) if vote.confidence.is_finite() => {
                breaker.record_success();
                vote.provider_id = id.to_string();
                vote.confidence = vote.confidence.clamp(0.0, 1.0);
                vote.latency_ms = latency_ms;
                vote.error = None;
                vote
            }
            Ok(_) => {
                breaker.record_failure(now);
                tracing::warn!("Provider {} returned a non-finite confidence", id);
                AiVote::failed(id, "non-finite confidence".to_string(), latency_ms)
            }
            Err(e) => {
                if breaker.record_failure(now) {
                    tracing::warn!("Provider {} disabled after repeated failures: {}", id, e);
                } else {
                    tracing::warn!("Provider {} failed: {}", id, e);
                }
                AiVote::failed(id, e.to_string(), latency_ms)
            }
        }
    }
}
