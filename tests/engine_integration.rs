//! Engine Integration Tests
//!
//! End-to-end cycles through `WalletBot` with mock market data, AI providers
//! and executor:
//! 1. Discovery -> screening -> consensus/strategy merge -> risk -> execution
//! 2. Monitoring -> exit rules -> journal -> burn planning
//! 3. Drawdown latch, restart from the JSON store and wallet isolation
//!
//! All tests are deterministic (no real network calls) and use mock data.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::TempDir;

use gigabrain::adapters::store::{JsonFileStore, MemoryStore};
use gigabrain::application::{event_channel, BotDeps, BotSettings, EngineEvent, WalletBot};
use gigabrain::domain::{
    Action, BurnPolicyUpdate, ExitReason, HivemindStrategyConfig, OpenRequest, Position, PositionMode,
    StrategyId, TokenCandidate,
};
use gigabrain::hivemind::{Hivemind, HivemindConfig};
use gigabrain::ports::mocks::{MockExecutor, MockMarketData, MockProvider};
use gigabrain::ports::{AiProvider, EngineStore};
use gigabrain::strategy::{StrategyEvaluator, StrategyParams};

// ============================================================================
// Test Fixtures
// ============================================================================

/// A fresh 1h breakout the momentum strategy buys
fn breakout(mint: &str, price: f64) -> TokenCandidate {
    let mut t = TokenCandidate::new(mint, mint.to_uppercase());
    t.price_sol = Some(price);
    t.volume_24h_usd = Some(500_000.0);
    t.liquidity_usd = Some(100_000.0);
    t.price_change_1h = Some(10.0);
    t.price_change_24h = Some(8.0);
    t.organic_score = Some(80.0);
    t.quality_score = Some(80.0);
    t.estimated_age_hours = Some(48.0);
    t.estimated_holders = Some(1_000);
    t
}

/// Bundled launch: inorganic volume far above thin liquidity
fn bundled(mint: &str) -> TokenCandidate {
    let mut t = breakout(mint, 0.001);
    t.organic_score = Some(15.0);
    t.quality_score = Some(20.0);
    t.volume_24h_usd = Some(2_000_000.0);
    t.liquidity_usd = Some(50_000.0);
    t.estimated_age_hours = Some(24.0);
    t
}

/// Position seeded straight into the store, as if opened by an earlier run
fn held_position(wallet: &str, mint: &str, amount_sol: f64) -> Position {
    Position::open(
        OpenRequest {
            owner_wallet: wallet.into(),
            token_mint: mint.into(),
            symbol: mint.to_uppercase(),
            entry_price_sol: 1.0,
            amount_sol,
            token_amount: amount_sol,
            strategy: StrategyId::GridTrading,
            confidence_at_entry: 0.7,
            profit_target_pct: 15.0,
            stop_loss_pct: 60.0,
            mode: PositionMode::Scalp,
        },
        Utc::now(),
    )
    .unwrap()
}

struct World {
    market: MockMarketData,
    executor: MockExecutor,
}

impl World {
    fn new(tokens: Vec<TokenCandidate>) -> Self {
        let executor = MockExecutor::new();
        for t in &tokens {
            if let Some(p) = t.price_sol {
                executor.set_price(&t.mint, p);
            }
        }
        Self {
            market: MockMarketData::new().with_candidates(tokens),
            executor,
        }
    }

    fn set_price(&self, mint: &str, price: f64) {
        self.market.update(mint, |t| t.price_sol = Some(price));
        self.executor.set_price(mint, price);
    }

    async fn bot(
        &self,
        wallet: &str,
        store: Arc<dyn EngineStore>,
        providers: Vec<Arc<dyn AiProvider>>,
    ) -> WalletBot {
        let (events, _) = event_channel();
        let deps = BotDeps {
            market: Arc::new(self.market.clone()),
            hivemind: Arc::new(Hivemind::new(HivemindConfig::default(), providers)),
            executor: Arc::new(self.executor.clone()),
            store,
            evaluator: Arc::new(StrategyEvaluator::new(&StrategyParams::default())),
            events,
        };
        WalletBot::load(wallet, deps, BotSettings::default(), HivemindStrategyConfig::baseline(Utc::now()))
            .await
            .unwrap()
    }
}

fn bullish_panel() -> Vec<Arc<dyn AiProvider>> {
    vec![
        Arc::new(MockProvider::voting("alpha", 1, Action::Buy, 0.9)),
        Arc::new(MockProvider::voting("beta", 2, Action::Buy, 0.85)),
    ]
}

// ============================================================================
// Entry Flow
// ============================================================================

#[tokio::test]
async fn test_zero_ai_votes_still_trades_momentum() {
    let world = World::new(vec![breakout("mom", 0.002)]);
    let bot = world.bot("w1", Arc::new(MemoryStore::new()), vec![]).await;

    let report = bot.quick_scan(Utc::now()).await.unwrap();
    assert_eq!(report.opened, vec!["mom".to_string()]);

    let status = bot.status(Utc::now()).await;
    assert_eq!(status.open_positions[0].strategy, StrategyId::MomentumBreakout);
    assert_eq!(status.trades_today, 1);
}

#[tokio::test]
async fn test_ai_consensus_buy_uses_hivemind_strategy() {
    let mut quiet = breakout("calm", 0.002);
    // no breakout, so only the panel can buy
    quiet.price_change_1h = Some(1.0);
    let world = World::new(vec![quiet]);
    let bot = world.bot("w1", Arc::new(MemoryStore::new()), bullish_panel()).await;

    let report = bot.deep_scan(Utc::now()).await.unwrap();
    assert_eq!(report.opened.len(), 1);
    let position = &bot.status(Utc::now()).await.open_positions[0];
    assert_eq!(position.strategy, StrategyId::Hivemind);
    // 0.875 confidence opens a swing position
    assert_eq!(position.mode, PositionMode::Swing);
}

#[tokio::test]
async fn test_bundled_token_blacklisted_and_excluded_later() {
    let world = World::new(vec![bundled("bundle"), breakout("good", 0.001)]);
    let store = Arc::new(MemoryStore::new());
    let bot = world.bot("w1", store.clone(), bullish_panel()).await;
    let mut events = bot.subscribe();

    let first = bot.quick_scan(Utc::now()).await.unwrap();
    assert_eq!(first.blacklisted, vec!["bundle".to_string()]);
    assert_eq!(first.opened, vec!["good".to_string()]);
    assert!(matches!(events.recv().await.unwrap(), EngineEvent::Blacklisted { .. }));

    let second = bot.deep_scan(Utc::now()).await.unwrap();
    assert!(second.blacklisted.is_empty());
    assert!(second.opened.is_empty());
    assert!(world.executor.buys().iter().all(|(mint, _)| mint != "bundle"));
    assert_eq!(store.blacklist("w1").await.unwrap().len(), 1);
}

// ============================================================================
// Exit Flow
// ============================================================================

#[tokio::test]
async fn test_hard_stop_ignores_bullish_ai() {
    let world = World::new(vec![breakout("mom", 0.001)]);
    let store = Arc::new(MemoryStore::new());
    let bot = world.bot("w1", store.clone(), bullish_panel()).await;
    let now = Utc::now();
    bot.quick_scan(now).await.unwrap();

    world.set_price("mom", 0.00075);
    let report = bot.monitor_positions(now + Duration::minutes(1)).await.unwrap();
    assert_eq!(report.closed.len(), 1);
    assert_eq!(report.closed[0].exit_reason, ExitReason::StopLoss);
    assert!(report.closed[0].pnl_pct <= -24.9);
    assert_eq!(store.journal("w1").await.len(), 1);
}

#[tokio::test]
async fn test_profit_exit_journals_once_and_plans_burn() {
    let world = World::new(vec![breakout("mom", 0.001)]);
    let store = Arc::new(MemoryStore::new());
    let bot = world.bot("w1", store.clone(), vec![]).await;
    bot.update_burn_policy(BurnPolicyUpdate {
        enabled: Some(true),
        ..Default::default()
    })
    .await
    .unwrap();
    let mut events = bot.subscribe();
    let now = Utc::now();
    bot.quick_scan(now).await.unwrap();

    world.set_price("mom", 0.0013);
    let report = bot.monitor_positions(now + Duration::minutes(30)).await.unwrap();
    assert_eq!(report.closed.len(), 1);
    let entry = &report.closed[0];
    assert_eq!(entry.exit_reason, ExitReason::ProfitTarget);
    assert!(entry.pnl_sol > 0.0);
    assert!(entry.pnl_pct > 0.0);

    bot.monitor_positions(now + Duration::minutes(31)).await.unwrap();
    let journal = store.journal("w1").await;
    assert_eq!(journal.len(), 1);
    assert_eq!(&journal[0], entry);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert!(kinds.contains(&"position_opened"));
    assert!(kinds.contains(&"position_closed"));
    assert!(kinds.contains(&"burn_planned"));
}

#[tokio::test]
async fn test_failed_sell_retried_next_cycle() {
    let world = World::new(vec![breakout("mom", 0.001)]);
    let store = Arc::new(MemoryStore::new());
    let bot = world.bot("w1", store.clone(), vec![]).await;
    let now = Utc::now();
    bot.quick_scan(now).await.unwrap();

    world.set_price("mom", 0.0007);
    world.executor.set_fail_sells(true);
    let failed = bot.monitor_positions(now + Duration::minutes(1)).await.unwrap();
    assert_eq!(failed.failed, 1);
    assert_eq!(bot.status(now).await.open_positions.len(), 1);
    assert!(store.journal("w1").await.is_empty());

    world.executor.set_fail_sells(false);
    let retried = bot.monitor_positions(now + Duration::minutes(2)).await.unwrap();
    assert_eq!(retried.closed.len(), 1);
    assert_eq!(store.journal("w1").await.len(), 1);
    assert!(bot.status(now).await.open_positions.is_empty());
}

// ============================================================================
// Portfolio Safety
// ============================================================================

#[tokio::test]
async fn test_drawdown_pause_blocks_new_buys() {
    let world = World::new(vec![breakout("held", 1.0), breakout("fresh", 0.001)]);
    let store = Arc::new(MemoryStore::new());
    let held = held_position("w1", "held", 5.0);
    store.upsert_position(&held).await.unwrap();

    let bot = world.bot("w1", store.clone(), vec![]).await;
    let mut events = bot.subscribe();
    world.set_price("held", 0.5);

    let rebalance = bot.rebalance(Utc::now()).await.unwrap();
    assert!(rebalance.drawdown_paused);
    assert!((rebalance.drawdown_pct - 25.0).abs() < 1e-6);
    assert!(matches!(events.recv().await.unwrap(), EngineEvent::DrawdownPaused { .. }));

    let scan = bot.quick_scan(Utc::now()).await.unwrap();
    assert!(scan.opened.is_empty());
    assert!(world.executor.buys().is_empty());
}

#[tokio::test]
async fn test_restart_restores_positions_blacklist_and_drawdown_latch() {
    let dir = TempDir::new().unwrap();
    let world = World::new(vec![bundled("bundle"), breakout("held", 1.0), breakout("mom", 0.001)]);
    let now = Utc::now();

    {
        let store = Arc::new(JsonFileStore::new(dir.path()));
        store.upsert_position(&held_position("w1", "held", 5.0)).await.unwrap();
        let bot = world.bot("w1", store, vec![]).await;
        let report = bot.quick_scan(now).await.unwrap();
        assert_eq!(report.opened, vec!["mom".to_string()]);

        world.set_price("held", 0.5);
        let rebalance = bot.rebalance(now).await.unwrap();
        assert!(rebalance.drawdown_paused);
        assert!((rebalance.peak_value_sol - 10.0).abs() < 1e-6);
    }

    let store = Arc::new(JsonFileStore::new(dir.path()));
    let bot = world.bot("w1", store, vec![]).await;
    let status = bot.status(now).await;
    assert_eq!(status.open_positions.len(), 2);
    assert_eq!(status.blacklisted, 1);
    assert!(status.drawdown_paused);
    assert!((status.peak_value_sol - 10.0).abs() < 1e-6);
    assert!((status.total_value_sol - 7.5).abs() < 1e-6);
    assert_eq!(status.trades_today, 1);

    // the latch still blocks a fresh breakout after the restart
    world.market.set_candidates(vec![breakout("fresh", 0.001), breakout("held", 0.5)]);
    world.executor.set_price("fresh", 0.001);
    let report = bot.quick_scan(now).await.unwrap();
    assert!(report.opened.is_empty());
    assert_eq!(world.executor.buys().len(), 1);
}

#[tokio::test]
async fn test_wallets_are_isolated() {
    let world = World::new(vec![breakout("mom", 0.001)]);
    let store = Arc::new(MemoryStore::new());
    let a = world.bot("wa", store.clone(), vec![]).await;
    let b = world.bot("wb", store.clone(), vec![]).await;
    let now = Utc::now();

    a.add_blacklist("mom", "not for this wallet".into(), now).await.unwrap();
    assert!(a.quick_scan(now).await.unwrap().opened.is_empty());
    assert_eq!(b.quick_scan(now).await.unwrap().opened, vec!["mom".to_string()]);

    assert!(store.blacklist("wb").await.unwrap().is_empty());
    assert_eq!(a.status(now).await.open_positions.len(), 0);
    assert_eq!(b.status(now).await.open_positions.len(), 1);
}
