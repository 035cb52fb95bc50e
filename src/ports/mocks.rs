//! Hand-written port mocks shared by unit and integration tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::ai_provider::{AiProvider, ProviderError, ProviderTier};
use super::execution::{BuyFill, ExecutionError, SellFill, TradeExecutor};
use super::market_data::{MarketDataError, MarketDataPort};
use crate::domain::{Action, AiVote, TokenCandidate};

/// Market data mock serving a replaceable candidate list
#[derive(Debug, Default, Clone)]
pub struct MockMarketData {
    candidates: Arc<Mutex<Vec<TokenCandidate>>>,
    calls: Arc<AtomicUsize>,
    fail: Arc<Mutex<bool>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(self, candidates: Vec<TokenCandidate>) -> Self {
        self.set_candidates(candidates);
        self
    }

    pub fn set_candidates(&self, candidates: Vec<TokenCandidate>) {
        *self.candidates.lock().unwrap() = candidates;
    }

    /// Apply `f` to the listed candidate with `mint`
    pub fn update(&self, mint: &str, f: impl FnOnce(&mut TokenCandidate)) {
        if let Some(token) = self.candidates.lock().unwrap().iter_mut().find(|t| t.mint == mint) {
            f(token);
        }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataPort for MockMarketData {
    async fn list_candidates(&self) -> Result<Vec<TokenCandidate>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(MarketDataError::Unavailable("mock failure".into()));
        }
        Ok(self.candidates.lock().unwrap().clone())
    }
}

/// Scripted behaviour of a [`MockProvider`]
#[derive(Debug, Clone)]
pub enum ProviderBehavior {
    Vote { action: Action, confidence: f64 },
    Fail(ProviderError),
    /// Sleep before voting; used to exercise timeouts
    Slow { delay: Duration, action: Action, confidence: f64 },
}

#[derive(Debug)]
pub struct MockProvider {
    id: String,
    tier: ProviderTier,
    priority: u32,
    behavior: Mutex<ProviderBehavior>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: &str, priority: u32, behavior: ProviderBehavior) -> Self {
        Self {
            id: id.to_string(),
            tier: ProviderTier::FreeReliable,
            priority,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn voting(id: &str, priority: u32, action: Action, confidence: f64) -> Self {
        Self::new(id, priority, ProviderBehavior::Vote { action, confidence })
    }

    pub fn failing(id: &str, priority: u32) -> Self {
        Self::new(id, priority, ProviderBehavior::Fail(ProviderError::Http("503".into())))
    }

    pub fn with_tier(mut self, tier: ProviderTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn set_behavior(&self, behavior: ProviderBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn tier(&self) -> ProviderTier {
        self.tier
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn analyze(
        &self,
        _candidate: &TokenCandidate,
        _risk_tolerance: f64,
        budget_sol: f64,
    ) -> Result<AiVote, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        let (action, confidence) = match behavior {
            ProviderBehavior::Vote { action, confidence } => (action, confidence),
            ProviderBehavior::Fail(err) => return Err(err),
            ProviderBehavior::Slow { delay, action, confidence } => {
                tokio::time::sleep(delay).await;
                (action, confidence)
            }
        };
        Ok(AiVote {
            provider_id: self.id.clone(),
            action,
            confidence,
            suggested_amount_sol: budget_sol,
            reasoning: format!("{} says {}", self.id, action),
            latency_ms: 1,
            error: None,
        })
    }
}

/// Executor mock filling at a per-mint price table
#[derive(Debug, Default, Clone)]
pub struct MockExecutor {
    prices: Arc<Mutex<HashMap<String, f64>>>,
    buys: Arc<Mutex<Vec<(String, f64)>>>,
    sells: Arc<Mutex<Vec<(String, f64)>>>,
    fail_sells: Arc<Mutex<bool>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, mint: &str, price_sol: f64) {
        self.prices.lock().unwrap().insert(mint.to_string(), price_sol);
    }

    pub fn set_fail_sells(&self, fail: bool) {
        *self.fail_sells.lock().unwrap() = fail;
    }

    pub fn buys(&self) -> Vec<(String, f64)> {
        self.buys.lock().unwrap().clone()
    }

    pub fn sells(&self) -> Vec<(String, f64)> {
        self.sells.lock().unwrap().clone()
    }

    fn price(&self, mint: &str) -> Result<f64, ExecutionError> {
        self.prices
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .filter(|p| *p > 0.0)
            .ok_or_else(|| ExecutionError::ApiError(format!("no price for {}", mint)))
    }
}

#[async_trait]
impl TradeExecutor for MockExecutor {
    async fn buy(&self, mint: &str, amount_sol: f64, _slippage_bps: u16) -> Result<BuyFill, ExecutionError> {
        let price = self.price(mint)?;
        self.buys.lock().unwrap().push((mint.to_string(), amount_sol));
        Ok(BuyFill {
            signature: format!("mock-buy-{}", self.buys.lock().unwrap().len()),
            tokens_received: amount_sol / price,
        })
    }

    async fn sell(&self, mint: &str, token_amount: f64, _slippage_bps: u16) -> Result<SellFill, ExecutionError> {
        if *self.fail_sells.lock().unwrap() {
            return Err(ExecutionError::ExecutionFailed("mock sell failure".into()));
        }
        let price = self.price(mint)?;
        self.sells.lock().unwrap().push((mint.to_string(), token_amount));
        Ok(SellFill {
            signature: format!("mock-sell-{}", self.sells.lock().unwrap().len()),
            sol_received: token_amount * price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_market_data() {
        let mock = MockMarketData::new().with_candidates(vec![TokenCandidate::new("m1", "ONE")]);
        let listed = mock.list_candidates().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(mock.get_token("m1").await.unwrap().is_some());
        assert!(mock.get_token("m2").await.unwrap().is_none());
        assert_eq!(mock.call_count(), 3);

        mock.set_failing(true);
        assert!(mock.list_candidates().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_executor_round_trip_value() {
        let mock = MockExecutor::new();
        mock.set_price("m1", 0.5);
        let fill = mock.buy("m1", 1.0, 100).await.unwrap();
        assert_eq!(fill.tokens_received, 2.0);

        mock.set_price("m1", 0.75);
        let sold = mock.sell("m1", fill.tokens_received, 100).await.unwrap();
        assert_eq!(sold.sol_received, 1.5);
        assert_eq!(mock.sells().len(), 1);

        mock.set_fail_sells(true);
        assert!(mock.sell("m1", 1.0, 100).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockProvider::voting("p1", 1, Action::Buy, 0.8);
        let vote = provider
            .analyze(&TokenCandidate::new("m", "M"), 0.5, 0.2)
            .await
            .unwrap();
        assert_eq!(vote.action, Action::Buy);
        assert_eq!(provider.call_count(), 1);

        provider.set_behavior(ProviderBehavior::Fail(ProviderError::RateLimited));
        assert!(provider.analyze(&TokenCandidate::new("m", "M"), 0.5, 0.2).await.is_err());
    }
}
