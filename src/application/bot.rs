//! Wallet Bot
//!
//! One independent decision engine per wallet. All mutation of the
//! portfolio, positions, blacklist and strategy config goes through a single
//! tokio `Mutex`, so only one scan/monitor/rebalance/recalibration cycle can
//! change state at a time. Market data and AI consultations run before the
//! lock is taken.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};

use super::events::EngineEvent;
use crate::config::Config;
use crate::domain::{
    evaluate_exit, filter_candidates, merge_intents, rotation_candidate, Action, Blacklist, BlacklistEntry,
    BurnLedger, BurnPolicy, BurnPolicyError, BurnPolicyUpdate, ConsensusResult, DrawdownBand, DrawdownTransition,
    ExitReason, HivemindStrategyConfig, JournalStats, LifecycleConfig, ManipulationScreener, OpenRequest,
    PortfolioState, Position, PositionError, RecalibrationError, RecalibrationSettings, Recalibrator,
    RiskGovernor, RiskLimits, RiskRejection, ScreenVerdict, ScreenerConfig, Severity, SignalSource, StrategyId,
    StrategySignal, TokenCandidate, TradeIntent, TradeJournalEntry,
};
use crate::hivemind::{Hivemind, ProviderStatus, ScanDepth};
use crate::ports::{EngineStore, ExecutionError, KeyVaultError, MarketDataPort, StoreError, TradeExecutor};
use crate::strategy::StrategyEvaluator;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Recalibration failed: {0}")]
    Recalibration(#[from] RecalibrationError),

    #[error("Key vault error: {0}")]
    KeyVault(#[from] KeyVaultError),

    #[error("Burn policy error: {0}")]
    BurnPolicy(#[from] BurnPolicyError),

    #[error("No open position for {0}")]
    PositionNotFound(String),

    #[error("Bot already running for wallet {0}")]
    AlreadyRunning(String),
}

/// Collaborators owned by one bot
#[derive(Clone)]
pub struct BotDeps {
    pub market: Arc<dyn MarketDataPort>,
    /// Per-wallet panel; breaker state is never shared between wallets
    pub hivemind: Arc<Hivemind>,
    pub executor: Arc<dyn TradeExecutor>,
    pub store: Arc<dyn EngineStore>,
    pub evaluator: Arc<StrategyEvaluator>,
    pub events: broadcast::Sender<EngineEvent>,
}

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub screener: ScreenerConfig,
    pub risk: RiskLimits,
    pub drawdown: DrawdownBand,
    pub lifecycle: LifecycleConfig,
    pub recalibration: RecalibrationSettings,
    pub burn: BurnPolicy,
    pub slippage_bps: u16,
    pub initial_cash_sol: f64,
    /// Shortlist size after the quality gate
    pub quick_scan_candidates: usize,
    pub deep_scan_candidates: usize,
    /// Closed trades fed to recalibration
    pub journal_window: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            screener: ScreenerConfig::default(),
            risk: RiskLimits::default(),
            drawdown: DrawdownBand::default(),
            lifecycle: LifecycleConfig::default(),
            recalibration: RecalibrationSettings::default(),
            burn: BurnPolicy::default(),
            slippage_bps: 100,
            initial_cash_sol: 10.0,
            quick_scan_candidates: 5,
            deep_scan_candidates: 20,
            journal_window: 50,
        }
    }
}

impl BotSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            screener: config.screener.clone(),
            risk: config.risk.limits.clone(),
            drawdown: config.risk.drawdown,
            lifecycle: config.lifecycle.clone(),
            recalibration: config.recalibration.clone(),
            burn: config.burn.clone(),
            slippage_bps: config.execution.slippage_bps,
            initial_cash_sol: config.execution.initial_cash_sol,
            quick_scan_candidates: config.engine.quick_scan_candidates,
            deep_scan_candidates: config.engine.deep_scan_candidates,
            journal_window: config.engine.journal_window,
        }
    }
}

struct BotState {
    portfolio: PortfolioState,
    blacklist: Blacklist,
    strategy_config: HivemindStrategyConfig,
    burn_policy: BurnPolicy,
    burn_ledger: BurnLedger,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub candidates: usize,
    pub blacklisted: Vec<String>,
    pub shortlisted: usize,
    pub opened: Vec<String>,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorReport {
    pub checked: usize,
    pub closed: Vec<TradeJournalEntry>,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceReport {
    pub cash_sol: f64,
    pub total_value_sol: f64,
    pub peak_value_sol: f64,
    pub drawdown_pct: f64,
    pub drawdown_paused: bool,
    /// Positions above the per-position concentration cap at current marks
    pub over_concentrated: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotStatus {
    pub wallet: String,
    pub cash_sol: f64,
    pub total_value_sol: f64,
    pub peak_value_sol: f64,
    pub drawdown_pct: f64,
    pub drawdown_paused: bool,
    pub trades_today: u32,
    pub open_positions: Vec<Position>,
    pub blacklisted: usize,
    pub strategy_config: HivemindStrategyConfig,
    pub config_expired: bool,
    pub burn_ledger: BurnLedger,
    pub providers: Vec<ProviderStatus>,
}

/// Held position plus what was learned about it outside the lock
struct Assessment {
    price: Option<f64>,
    strategy_sell: Option<StrategySignal>,
    consensus: Option<ConsensusResult>,
}

pub struct WalletBot {
    wallet: String,
    deps: BotDeps,
    settings: BotSettings,
    screener: ManipulationScreener,
    governor: RiskGovernor,
    recalibrator: Recalibrator,
    state: Mutex<BotState>,
}

impl WalletBot {
    /// Restore a bot from the store, seeding the strategy config from
    /// `baseline` when none was saved.
    pub async fn load(
        wallet: impl Into<String>,
        deps: BotDeps,
        settings: BotSettings,
        baseline: HivemindStrategyConfig,
    ) -> Result<Self, EngineError> {
        let wallet = wallet.into();
        let positions = deps.store.open_positions(&wallet).await?;
        let blacklist = Blacklist::from_entries(deps.store.blacklist(&wallet).await?);
        let strategy_config = match deps.store.strategy_config(&wallet).await? {
            Some(saved) => saved,
            None => {
                deps.store.save_strategy_config(&wallet, &baseline).await?;
                baseline.clone()
            }
        };

        let mut portfolio = match deps.store.portfolio(&wallet).await? {
            Some(snapshot) => PortfolioState::restore(wallet.clone(), &snapshot, positions),
            None => {
                let mut fresh = PortfolioState::new(wallet.clone(), settings.initial_cash_sol);
                for position in positions {
                    fresh.add_position(position);
                }
                fresh
            }
        };
        portfolio.revalue(settings.drawdown);

        tracing::info!(
            "Loaded bot for {}: {} open positions, {} blacklisted, {:.4} SOL (peak {:.4}{})",
            wallet,
            portfolio.position_count(),
            blacklist.len(),
            portfolio.total_value_sol,
            portfolio.peak_value_sol,
            if portfolio.drawdown_paused { ", buys paused" } else { "" }
        );

        Ok(Self {
            screener: ManipulationScreener::new(settings.screener.clone()),
            governor: RiskGovernor::new(settings.risk.clone()),
            recalibrator: Recalibrator::new(settings.recalibration.clone(), baseline),
            state: Mutex::new(BotState {
                portfolio,
                blacklist,
                strategy_config,
                burn_policy: settings.burn.clone(),
                burn_ledger: BurnLedger::default(),
            }),
            wallet,
            deps,
            settings,
        })
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.deps.events.subscribe()
    }

    fn publish(&self, event: EngineEvent) {
        tracing::debug!("[{}] event {}", self.wallet, event.kind());
        // no subscribers is fine
        let _ = self.deps.events.send(event);
    }

    pub async fn quick_scan(&self, now: DateTime<Utc>) -> Result<ScanReport, EngineError> {
        self.scan(ScanDepth::Quick, now).await
    }

    pub async fn deep_scan(&self, now: DateTime<Utc>) -> Result<ScanReport, EngineError> {
        self.scan(ScanDepth::Deep, now).await
    }

    /// Discover, screen, consult and open new positions
    async fn scan(&self, depth: ScanDepth, now: DateTime<Utc>) -> Result<ScanReport, EngineError> {
        let (config, mut blacklist, total_value) = {
            let state = self.state.lock().await;
            (
                state.strategy_config.clone(),
                state.blacklist.clone(),
                state.portfolio.total_value_sol,
            )
        };
        if config.is_expired(now) {
            tracing::warn!("[{}] strategy config expired at {}, still using it", self.wallet, config.valid_until);
        }

        let mut report = ScanReport::default();
        let candidates = match self.deps.market.list_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("[{}] market data unavailable, skipping {:?} scan: {}", self.wallet, depth, e);
                return Ok(report);
            }
        };
        report.candidates = candidates.len();

        let mut screened = Vec::with_capacity(candidates.len());
        for token in candidates {
            if blacklist.contains(&token.mint) {
                continue;
            }
            let score = self.screener.score(&token);
            match self.screener.verdict(&score) {
                ScreenVerdict::Reject => {
                    let entry = BlacklistEntry::system(&token.mint, score.summary(), score.severity, now);
                    blacklist.insert(entry.clone());
                    self.record_blacklist(entry).await?;
                    report.blacklisted.push(token.mint);
                }
                ScreenVerdict::PassWithWarning(note) => {
                    tracing::warn!("[{}] {} ({}) flagged: {}", self.wallet, token.symbol, token.mint, note);
                    screened.push(token);
                }
                ScreenVerdict::Pass => screened.push(token),
            }
        }

        let limit = match depth {
            ScanDepth::Quick => self.settings.quick_scan_candidates,
            ScanDepth::Deep => self.settings.deep_scan_candidates,
        };
        let shortlist: Vec<TokenCandidate> = filter_candidates(screened, &config, &blacklist)
            .into_iter()
            .take(limit)
            .collect();
        report.shortlisted = shortlist.len();

        let budget_sol = total_value * config.budget_per_trade_pct / 100.0;
        for token in shortlist {
            if self.state.lock().await.portfolio.has_position(&token.mint) {
                continue;
            }

            let consensus = self
                .deps
                .hivemind
                .consult(&token, config.risk_level.tolerance(), budget_sol, depth, now)
                .await;
            let signal = self.deps.evaluator.evaluate(&token, None);

            let Some(intent) = entry_intent(&consensus, signal.as_ref(), &config, &self.settings.lifecycle) else {
                tracing::debug!("[{}] no signal for {}", self.wallet, token.symbol);
                continue;
            };
            if intent.action() != Action::Buy {
                tracing::info!("[{}] {} vetoed: {}", self.wallet, token.symbol, intent.reasoning);
                continue;
            }

            match self.open_position(&token, &intent, signal.as_ref(), now).await {
                Ok(Some(position)) => report.opened.push(position.token_mint),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("[{}] failed to open {}: {}", self.wallet, token.symbol, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "[{}] {:?} scan: {} candidates, {} blacklisted, {} shortlisted, {} opened",
            self.wallet,
            depth,
            report.candidates,
            report.blacklisted.len(),
            report.shortlisted,
            report.opened.len()
        );
        Ok(report)
    }

    /// Size and execute a buy. `Ok(None)` means the risk governor declined.
    async fn open_position(
        &self,
        token: &TokenCandidate,
        intent: &TradeIntent,
        signal: Option<&StrategySignal>,
        now: DateTime<Utc>,
    ) -> Result<Option<Position>, EngineError> {
        let Some(price) = token.current_price_sol() else {
            tracing::debug!("[{}] no SOL price for {}, cannot size", self.wallet, token.symbol);
            return Ok(None);
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.portfolio.roll_day(now);

        let sized = match self.governor.size_trade(
            &state.portfolio,
            &state.strategy_config,
            &token.mint,
            intent.confidence,
            now,
        ) {
            Ok(sized) => sized,
            Err(RiskRejection::ReserveExhausted | RiskRejection::BelowMinNotional(..))
                if self.governor.reserve_exhausted(&state.portfolio) =>
            {
                let weakest = rotation_candidate(
                    state.portfolio.open_positions.values(),
                    intent.confidence,
                    &self.settings.lifecycle,
                )
                .map(|p| (p.token_mint.clone(), p.confidence_at_entry));
                let Some((mint, weakest_confidence)) = weakest else {
                    tracing::info!("[{}] reserve exhausted, no rotation for {}", self.wallet, token.symbol);
                    return Ok(None);
                };
                let reasoning = format!(
                    "Rotating into {} ({:.2} vs {:.2})",
                    token.symbol, intent.confidence, weakest_confidence
                );
                self.close_locked(state, &mint, ExitReason::Rotation, reasoning, now).await?;
                match self.governor.size_trade(
                    &state.portfolio,
                    &state.strategy_config,
                    &token.mint,
                    intent.confidence,
                    now,
                ) {
                    Ok(sized) => sized,
                    Err(rejection) => {
                        tracing::info!("[{}] {} rejected after rotation: {}", self.wallet, token.symbol, rejection);
                        return Ok(None);
                    }
                }
            }
            Err(rejection) => {
                tracing::info!("[{}] {} rejected: {}", self.wallet, token.symbol, rejection);
                return Ok(None);
            }
        };

        let fill = self
            .deps
            .executor
            .buy(&token.mint, sized.amount_sol, self.settings.slippage_bps)
            .await?;

        let lifecycle = &self.settings.lifecycle;
        let mode = lifecycle.mode_for(intent.confidence);
        let limits = lifecycle.limits(mode);
        let (target, stop) = match signal.filter(|s| intent.source == SignalSource::StrategyBuy && s.strategy == intent.strategy) {
            Some(s) => (s.profit_target_pct, s.stop_loss_pct),
            None => (limits.profit_target_pct, limits.stop_loss_pct),
        };
        let entry_price = if fill.tokens_received > 0.0 {
            sized.amount_sol / fill.tokens_received
        } else {
            price
        };

        let position = Position::open(
            OpenRequest {
                owner_wallet: self.wallet.clone(),
                token_mint: token.mint.clone(),
                symbol: token.symbol.clone(),
                entry_price_sol: entry_price,
                amount_sol: sized.amount_sol,
                token_amount: fill.tokens_received,
                strategy: intent.strategy,
                confidence_at_entry: intent.confidence,
                profit_target_pct: target * state.strategy_config.profit_target_multiplier,
                stop_loss_pct: stop * state.strategy_config.stop_loss_multiplier,
                mode,
            },
            now,
        )?;

        if let Err(e) = self.deps.store.upsert_position(&position).await {
            tracing::error!("[{}] failed to persist position {}: {}", self.wallet, position.id, e);
        }
        state.portfolio.add_position(position.clone());
        state.portfolio.record_trade(now);
        self.revalue_locked(state, now).await;

        tracing::info!(
            "[{}] OPEN {} {:?} {:.4} SOL @ {:.10} via {} ({:.0}%{})",
            self.wallet,
            position.symbol,
            position.mode,
            position.amount_sol,
            position.entry_price_sol,
            position.strategy,
            intent.confidence * 100.0,
            if sized.capped { ", capped" } else { "" }
        );
        self.publish(EngineEvent::PositionOpened {
            position: position.clone(),
            signature: fill.signature,
        });
        Ok(Some(position))
    }

    /// Sell and close one open position while holding the state lock.
    ///
    /// A failed sell leaves the position open and records nothing.
    async fn close_locked(
        &self,
        state: &mut BotState,
        mint: &str,
        reason: ExitReason,
        reasoning: String,
        now: DateTime<Utc>,
    ) -> Result<TradeJournalEntry, EngineError> {
        let mut position = state
            .portfolio
            .open_positions
            .get(mint)
            .cloned()
            .ok_or_else(|| EngineError::PositionNotFound(mint.to_string()))?;

        let fill = match self
            .deps
            .executor
            .sell(mint, position.token_amount, self.settings.slippage_bps)
            .await
        {
            Ok(fill) => fill,
            Err(e) => {
                tracing::error!("[{}] sell {} ({}) failed, position stays open: {}", self.wallet, position.symbol, reason, e);
                return Err(e.into());
            }
        };

        position.close(now)?;
        let entry = TradeJournalEntry::from_close(&position, fill.sol_received, reason, now);
        state.portfolio.remove_position(mint, fill.sol_received);

        if let Err(e) = self.deps.store.upsert_position(&position).await {
            tracing::error!("[{}] failed to persist closed position {}: {}", self.wallet, position.id, e);
        }
        if let Err(e) = self.deps.store.append_journal(&entry).await {
            tracing::error!("[{}] failed to journal {}: {}", self.wallet, position.id, e);
        }

        tracing::info!(
            "[{}] CLOSE {} {}: {:+.4} SOL ({:+.1}%) after {}s - {}",
            self.wallet,
            position.symbol,
            reason,
            entry.pnl_sol,
            entry.pnl_pct,
            entry.hold_duration_secs,
            reasoning
        );
        self.publish(EngineEvent::PositionClosed {
            entry: entry.clone(),
            reason,
            signature: fill.signature,
        });

        if let Some(burn) = state.burn_ledger.plan(&state.burn_policy, &entry, now) {
            self.publish(EngineEvent::BurnPlanned(burn));
        }
        self.revalue_locked(state, now).await;
        Ok(entry)
    }

    /// Revalue, publish latch changes and checkpoint the portfolio
    async fn revalue_locked(&self, state: &mut BotState, now: DateTime<Utc>) {
        let wallet = self.wallet.clone();
        let transition = state.portfolio.revalue(self.settings.drawdown);
        if let Err(e) = self
            .deps
            .store
            .save_portfolio(&self.wallet, &state.portfolio.snapshot(now))
            .await
        {
            tracing::error!("[{}] failed to persist portfolio: {}", self.wallet, e);
        }
        match transition {
            Some(DrawdownTransition::Paused) => self.publish(EngineEvent::DrawdownPaused {
                wallet,
                drawdown_pct: state.portfolio.drawdown_pct(),
                at: now,
            }),
            Some(DrawdownTransition::Resumed) => self.publish(EngineEvent::DrawdownResumed {
                wallet,
                drawdown_pct: state.portfolio.drawdown_pct(),
                at: now,
            }),
            None => {}
        }
    }

    /// Mark every held position and apply the exit rules
    pub async fn monitor_positions(&self, now: DateTime<Utc>) -> Result<MonitorReport, EngineError> {
        let (held, risk_tolerance) = {
            let state = self.state.lock().await;
            (
                state.portfolio.open_positions.values().cloned().collect::<Vec<_>>(),
                state.strategy_config.risk_level.tolerance(),
            )
        };
        let mut report = MonitorReport::default();

        let market: HashMap<String, TokenCandidate> = if held.is_empty() {
            HashMap::new()
        } else {
            match self.deps.market.list_candidates().await {
                Ok(tokens) => tokens.into_iter().map(|t| (t.mint.clone(), t)).collect(),
                Err(e) => {
                    tracing::warn!("[{}] market data unavailable during monitor: {}", self.wallet, e);
                    HashMap::new()
                }
            }
        };

        let mut assessments: HashMap<String, Assessment> = HashMap::new();
        for position in &held {
            let Some(token) = market.get(&position.token_mint) else {
                tracing::warn!("[{}] no market data for held {}", self.wallet, position.symbol);
                continue;
            };
            let price = token.current_price_sol();
            let mut marked = position.clone();
            if let Some(p) = price {
                marked.mark(p)?;
            }
            let strategy_sell = self.deps.evaluator.evaluate(token, Some(&marked));
            // mechanical exits do not need the panel
            let consensus = match evaluate_exit(&marked, &self.settings.lifecycle, None, None, now) {
                Some(_) => None,
                None => Some(
                    self.deps
                        .hivemind
                        .consult(token, risk_tolerance, marked.amount_sol, ScanDepth::Quick, now)
                        .await,
                ),
            };
            assessments.insert(
                position.token_mint.clone(),
                Assessment {
                    price,
                    strategy_sell,
                    consensus,
                },
            );
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let mints: Vec<String> = state.portfolio.open_positions.keys().cloned().collect();
        for mint in mints {
            let assessment = assessments.remove(&mint);
            let decision = {
                let Some(position) = state.portfolio.open_positions.get_mut(&mint) else {
                    continue;
                };
                if let Some(price) = assessment.as_ref().and_then(|a| a.price) {
                    position.mark(price)?;
                    if let Err(e) = self.deps.store.upsert_position(position).await {
                        tracing::warn!("[{}] failed to persist mark for {}: {}", self.wallet, position.symbol, e);
                    }
                }
                evaluate_exit(
                    position,
                    &self.settings.lifecycle,
                    assessment.as_ref().and_then(|a| a.consensus.as_ref()),
                    assessment.as_ref().and_then(|a| a.strategy_sell.as_ref()),
                    now,
                )
            };
            report.checked += 1;

            if let Some(decision) = decision {
                match self.close_locked(state, &mint, decision.reason, decision.reasoning, now).await {
                    Ok(entry) => report.closed.push(entry),
                    Err(_) => report.failed += 1,
                }
            }
        }
        self.revalue_locked(state, now).await;

        tracing::debug!(
            "[{}] monitor: {} checked, {} closed, {} failed",
            self.wallet,
            report.checked,
            report.closed.len(),
            report.failed
        );
        Ok(report)
    }

    /// Refresh marks, the peak and the drawdown latch
    pub async fn rebalance(&self, now: DateTime<Utc>) -> Result<RebalanceReport, EngineError> {
        let prices: HashMap<String, f64> = match self.deps.market.list_candidates().await {
            Ok(tokens) => tokens
                .into_iter()
                .filter_map(|t| t.current_price_sol().map(|p| (t.mint, p)))
                .collect(),
            Err(e) => {
                tracing::warn!("[{}] market data unavailable during rebalance: {}", self.wallet, e);
                HashMap::new()
            }
        };

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.portfolio.roll_day(now);
        for position in state.portfolio.open_positions.values_mut() {
            if let Some(price) = prices.get(&position.token_mint) {
                position.mark(*price)?;
                if let Err(e) = self.deps.store.upsert_position(position).await {
                    tracing::warn!("[{}] failed to persist mark for {}: {}", self.wallet, position.symbol, e);
                }
            }
        }
        self.revalue_locked(state, now).await;

        let cap = state.portfolio.total_value_sol * self.settings.risk.max_position_pct / 100.0;
        let over_concentrated: Vec<String> = state
            .portfolio
            .open_positions
            .values()
            .filter(|p| p.current_value_sol() > cap)
            .map(|p| p.token_mint.clone())
            .collect();
        for mint in &over_concentrated {
            tracing::warn!("[{}] {} above {:.0}% concentration cap", self.wallet, mint, self.settings.risk.max_position_pct);
        }

        Ok(RebalanceReport {
            cash_sol: state.portfolio.cash_sol,
            total_value_sol: state.portfolio.total_value_sol,
            peak_value_sol: state.portfolio.peak_value_sol,
            drawdown_pct: state.portfolio.drawdown_pct(),
            drawdown_paused: state.portfolio.drawdown_paused,
            over_concentrated,
        })
    }

    /// Regenerate the strategy config from recent closed trades.
    ///
    /// On any failure the current config stays in force.
    pub async fn recalibrate(&self, now: DateTime<Utc>) -> Result<HivemindStrategyConfig, EngineError> {
        let result = async {
            let entries = self
                .deps
                .store
                .recent_journal(&self.wallet, self.settings.journal_window)
                .await
                .map_err(|e| RecalibrationError::JournalUnavailable(e.to_string()))?;
            let stats = JournalStats::from_entries(&entries);
            let next = self.recalibrator.recalibrate(&stats, now)?;
            self.deps.store.save_strategy_config(&self.wallet, &next).await?;
            Ok::<_, EngineError>(next)
        }
        .await;

        match result {
            Ok(next) => {
                self.state.lock().await.strategy_config = next.clone();
                self.publish(EngineEvent::ConfigRecalibrated {
                    wallet: self.wallet.clone(),
                    config: next.clone(),
                });
                Ok(next)
            }
            Err(e) => {
                tracing::warn!("[{}] recalibration failed, keeping prior config: {}", self.wallet, e);
                Err(e)
            }
        }
    }

    /// Close a position on request
    pub async fn close_position(&self, mint: &str, now: DateTime<Utc>) -> Result<TradeJournalEntry, EngineError> {
        let mut guard = self.state.lock().await;
        self.close_locked(&mut guard, mint, ExitReason::Manual, "manual close".to_string(), now)
            .await
    }

    /// Blacklist a mint on the wallet owner's behalf. Returns false if it
    /// was already listed.
    pub async fn add_blacklist(&self, mint: &str, reason: String, now: DateTime<Utc>) -> Result<bool, EngineError> {
        if self.state.lock().await.blacklist.contains(mint) {
            return Ok(false);
        }
        self.record_blacklist(BlacklistEntry::manual(mint, reason, now)).await?;
        Ok(true)
    }

    pub async fn remove_blacklist(&self, mint: &str) -> Result<bool, EngineError> {
        let mut state = self.state.lock().await;
        let removed = self.deps.store.remove_blacklist(&self.wallet, mint).await?;
        let in_memory = state.blacklist.remove(mint).is_some();
        if removed || in_memory {
            tracing::info!("[{}] removed {} from blacklist", self.wallet, mint);
        }
        Ok(removed || in_memory)
    }

    pub async fn blacklist(&self) -> Vec<BlacklistEntry> {
        self.state.lock().await.blacklist.entries().cloned().collect()
    }

    async fn record_blacklist(&self, entry: BlacklistEntry) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        self.deps.store.add_blacklist(&self.wallet, &entry).await?;
        if state.blacklist.insert(entry.clone()) {
            match entry.severity {
                Severity::Critical => tracing::warn!("[{}] blacklisted {}: {}", self.wallet, entry.token_mint, entry.reason),
                Severity::Warning => tracing::info!("[{}] blacklisted {}: {}", self.wallet, entry.token_mint, entry.reason),
            }
            self.publish(EngineEvent::Blacklisted {
                wallet: self.wallet.clone(),
                entry,
            });
        }
        Ok(())
    }

    /// Apply a burn policy change atomically
    pub async fn update_burn_policy(&self, update: BurnPolicyUpdate) -> Result<BurnPolicy, EngineError> {
        let mut state = self.state.lock().await;
        state.burn_policy.apply(update)?;
        Ok(state.burn_policy.clone())
    }

    pub async fn status(&self, now: DateTime<Utc>) -> BotStatus {
        let providers = self.deps.hivemind.provider_status(now).await;
        let state = self.state.lock().await;
        let mut open_positions: Vec<Position> = state.portfolio.open_positions.values().cloned().collect();
        open_positions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        let trades_today = match state.portfolio.trading_day {
            Some(day) if day == now.date_naive() => state.portfolio.trades_today,
            _ => 0,
        };

        BotStatus {
            wallet: self.wallet.clone(),
            cash_sol: state.portfolio.cash_sol,
            total_value_sol: state.portfolio.total_value_sol,
            peak_value_sol: state.portfolio.peak_value_sol,
            drawdown_pct: state.portfolio.drawdown_pct(),
            drawdown_paused: state.portfolio.drawdown_paused,
            trades_today,
            open_positions,
            blacklisted: state.blacklist.len(),
            strategy_config: state.strategy_config.clone(),
            config_expired: state.strategy_config.is_expired(now),
            burn_ledger: state.burn_ledger.clone(),
            providers,
        }
    }
}

/// Merge AI consensus and the best strategy signal for an unheld token
fn entry_intent(
    consensus: &ConsensusResult,
    signal: Option<&StrategySignal>,
    config: &HivemindStrategyConfig,
    lifecycle: &LifecycleConfig,
) -> Option<TradeIntent> {
    let mut intents = Vec::new();
    if consensus.is_sell_with(lifecycle.ai_sell_threshold) {
        intents.push(TradeIntent {
            source: SignalSource::AiSell,
            confidence: consensus.confidence,
            strategy: StrategyId::Hivemind,
            reasoning: format!("AI consensus SELL {:.0}%", consensus.confidence * 100.0),
        });
    }
    if consensus.is_buy_with(config.min_confidence) {
        intents.push(TradeIntent {
            source: SignalSource::AiBuy,
            confidence: consensus.confidence,
            strategy: StrategyId::Hivemind,
            reasoning: format!(
                "AI consensus BUY {:.0}% ({} votes)",
                consensus.confidence * 100.0,
                consensus.vote_count
            ),
        });
    }
    if let Some(signal) = signal.filter(|s| s.action == Action::Buy) {
        intents.push(TradeIntent {
            source: SignalSource::StrategyBuy,
            confidence: signal.confidence / 100.0,
            strategy: signal.strategy,
            reasoning: signal.reasoning.clone(),
        });
    }
    merge_intents(intents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::application::events::event_channel;
    use crate::domain::PositionMode;
    use crate::hivemind::HivemindConfig;
    use crate::ports::mocks::{MockExecutor, MockMarketData, MockProvider};
    use crate::ports::AiProvider;
    use crate::strategy::StrategyParams;
    use chrono::Duration;

    const WALLET: &str = "wallet-a";

    struct Harness {
        bot: WalletBot,
        market: MockMarketData,
        executor: MockExecutor,
        store: Arc<MemoryStore>,
        events: broadcast::Receiver<EngineEvent>,
    }

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

    async fn harness(tokens: Vec<TokenCandidate>, providers: Vec<Arc<dyn AiProvider>>) -> Harness {
        let market = MockMarketData::new().with_candidates(tokens.clone());
        let executor = MockExecutor::new();
        for t in &tokens {
            executor.set_price(&t.mint, t.price_sol.unwrap_or(0.0));
        }
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = event_channel();
        let deps = BotDeps {
            market: Arc::new(market.clone()),
            hivemind: Arc::new(Hivemind::new(HivemindConfig::default(), providers)),
            executor: Arc::new(executor.clone()),
            store: store.clone(),
            evaluator: Arc::new(StrategyEvaluator::new(&StrategyParams::default())),
            events: tx,
        };
        let bot = WalletBot::load(WALLET, deps, BotSettings::default(), HivemindStrategyConfig::baseline(Utc::now()))
            .await
            .unwrap();
        Harness {
            bot,
            market,
            executor,
            store,
            events: rx,
        }
    }

    #[tokio::test]
    async fn test_momentum_trade_without_ai_votes() {
        let mut h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        let report = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert_eq!(report.opened, vec!["m1".to_string()]);

        let status = h.bot.status(Utc::now()).await;
        assert_eq!(status.open_positions.len(), 1);
        let p = &status.open_positions[0];
        assert_eq!(p.strategy, StrategyId::MomentumBreakout);
        // 10% budget of 10 SOL, under the 15%-of-available ceiling
        assert!((p.amount_sol - 1.0).abs() < 1e-9);
        assert!(matches!(h.events.try_recv().unwrap(), EngineEvent::PositionOpened { .. }));
    }

    #[tokio::test]
    async fn test_ai_sell_consensus_vetoes_strategy_buy() {
        let providers: Vec<Arc<dyn AiProvider>> = vec![
            Arc::new(MockProvider::voting("a", 1, Action::Sell, 0.8)),
            Arc::new(MockProvider::voting("b", 2, Action::Sell, 0.7)),
        ];
        let h = harness(vec![breakout("m1", 0.001)], providers).await;
        let report = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert!(report.opened.is_empty());
        assert!(h.executor.buys().is_empty());
    }

    #[tokio::test]
    async fn test_critical_token_blacklisted_and_excluded() {
        let mut scam = breakout("scam", 0.001);
        scam.organic_score = Some(15.0);
        scam.quality_score = Some(20.0);
        scam.volume_24h_usd = Some(2_000_000.0);
        scam.liquidity_usd = Some(50_000.0);
        scam.estimated_age_hours = Some(24.0);

        let h = harness(vec![scam], vec![]).await;
        let first = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert_eq!(first.blacklisted, vec!["scam".to_string()]);
        assert_eq!(h.store.blacklist(WALLET).await.unwrap().len(), 1);

        let second = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert!(second.blacklisted.is_empty());
        assert_eq!(second.shortlisted, 0);
        assert!(h.executor.buys().is_empty());
    }

    #[tokio::test]
    async fn test_stop_loss_closes_with_single_journal_entry() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        let now = Utc::now();
        h.bot.quick_scan(now).await.unwrap();

        h.market.update("m1", |t| t.price_sol = Some(0.00075));
        h.executor.set_price("m1", 0.00075);
        let report = h.bot.monitor_positions(now + Duration::minutes(5)).await.unwrap();
        assert_eq!(report.closed.len(), 1);
        assert_eq!(report.closed[0].exit_reason, ExitReason::StopLoss);
        assert!(report.closed[0].pnl_sol < 0.0);

        let journal = h.store.journal(WALLET).await;
        assert_eq!(journal.len(), 1);
        assert!(h.bot.status(now).await.open_positions.is_empty());

        // nothing left to close
        let again = h.bot.monitor_positions(now + Duration::minutes(10)).await.unwrap();
        assert!(again.closed.is_empty());
        assert_eq!(h.store.journal(WALLET).await.len(), 1);
    }

    #[tokio::test]
    async fn test_momentum_position_ignores_grid_step_exit() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        let now = Utc::now();
        h.bot.quick_scan(now).await.unwrap();

        h.market.update("m1", |t| {
            t.price_sol = Some(0.00104);
            t.price_change_1h = Some(3.0);
        });
        h.executor.set_price("m1", 0.00104);
        let report = h.bot.monitor_positions(now + Duration::minutes(5)).await.unwrap();
        assert_eq!(report.checked, 1);
        assert!(report.closed.is_empty());

        let status = h.bot.status(now).await;
        assert_eq!(status.open_positions.len(), 1);
        assert!((status.open_positions[0].current_pnl_pct() - 4.0).abs() < 1e-6);
        assert!(h.executor.sells().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sell_leaves_position_open() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        let now = Utc::now();
        h.bot.quick_scan(now).await.unwrap();

        h.market.update("m1", |t| t.price_sol = Some(0.0005));
        h.executor.set_price("m1", 0.0005);
        h.executor.set_fail_sells(true);
        let report = h.bot.monitor_positions(now).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(h.bot.status(now).await.open_positions.len(), 1);
        assert!(h.store.journal(WALLET).await.is_empty());
    }

    #[tokio::test]
    async fn test_drawdown_pause_blocks_buys() {
        let h = harness(vec![breakout("m1", 0.001), breakout("m2", 0.001)], vec![]).await;
        let now = Utc::now();
        {
            let mut state = h.bot.state.lock().await;
            state.portfolio.peak_value_sol = 20.0;
            state.portfolio.revalue(DrawdownBand::default());
            assert!(state.portfolio.drawdown_paused);
        }
        let report = h.bot.quick_scan(now).await.unwrap();
        assert!(report.opened.is_empty());
        assert!(h.executor.buys().is_empty());
    }

    fn held(mint: &str, amount_sol: f64, confidence: f64) -> Position {
        Position::open(
            OpenRequest {
                owner_wallet: WALLET.into(),
                token_mint: mint.into(),
                symbol: mint.to_uppercase(),
                entry_price_sol: 1.0,
                amount_sol,
                token_amount: amount_sol,
                strategy: StrategyId::GridTrading,
                confidence_at_entry: confidence,
                profit_target_pct: 3.0,
                stop_loss_pct: 6.0,
                mode: PositionMode::Scalp,
            },
            Utc::now(),
        )
        .unwrap()
    }

    /// Leave exactly the 10% reserve in cash
    async fn fill_to_reserve(h: &Harness, weakest_confidence: f64) {
        let mut state = h.bot.state.lock().await;
        for (mint, confidence) in [("weak", weakest_confidence), ("strong", 0.9)] {
            h.executor.set_price(mint, 1.0);
            state.portfolio.add_position(held(mint, 4.5, confidence));
        }
        state.portfolio.revalue(DrawdownBand::default());
    }

    #[tokio::test]
    async fn test_rotation_replaces_weakest_when_reserve_exhausted() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        fill_to_reserve(&h, 0.5).await;
        let now = Utc::now();

        // momentum 0.70 beats 0.50 by more than the 0.15 margin
        let report = h.bot.quick_scan(now).await.unwrap();
        assert_eq!(report.opened, vec!["m1".to_string()]);
        assert_eq!(h.executor.sells(), vec![("weak".to_string(), 4.5)]);

        let journal = h.store.journal(WALLET).await;
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].token_mint, "weak");
        assert_eq!(journal[0].exit_reason, ExitReason::Rotation);

        let status = h.bot.status(now).await;
        let mut mints: Vec<&str> = status.open_positions.iter().map(|p| p.token_mint.as_str()).collect();
        mints.sort();
        assert_eq!(mints, vec!["m1", "strong"]);
    }

    #[tokio::test]
    async fn test_no_rotation_below_required_advantage() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        fill_to_reserve(&h, 0.6).await;

        let report = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert!(report.opened.is_empty());
        assert!(h.executor.sells().is_empty());
        assert!(h.executor.buys().is_empty());
        assert!(h.store.journal(WALLET).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_rotation_while_free_capital_remains() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        {
            let mut state = h.bot.state.lock().await;
            h.executor.set_price("weak", 1.0);
            state.portfolio.add_position(held("weak", 2.0, 0.1));
            state.portfolio.revalue(DrawdownBand::default());
        }

        let report = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert_eq!(report.opened, vec!["m1".to_string()]);
        assert!(h.executor.sells().is_empty());
        assert!(h.store.journal(WALLET).await.is_empty());
        assert_eq!(h.bot.status(Utc::now()).await.open_positions.len(), 2);
    }

    #[tokio::test]
    async fn test_manual_blacklist_and_removal() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        let now = Utc::now();
        assert!(h.bot.add_blacklist("m1", "manual".into(), now).await.unwrap());
        assert!(!h.bot.add_blacklist("m1", "manual".into(), now).await.unwrap());
        assert!(h.bot.quick_scan(now).await.unwrap().opened.is_empty());

        assert!(h.bot.remove_blacklist("m1").await.unwrap());
        assert_eq!(h.bot.quick_scan(now).await.unwrap().opened.len(), 1);
    }

    #[tokio::test]
    async fn test_recalibrate_persists_and_publishes() {
        let mut h = harness(vec![], vec![]).await;
        let now = Utc::now();
        let next = h.bot.recalibrate(now).await.unwrap();
        assert_eq!(next.generated_at, now);
        assert_eq!(h.store.strategy_config(WALLET).await.unwrap(), Some(next.clone()));
        assert!(matches!(h.events.try_recv().unwrap(), EngineEvent::ConfigRecalibrated { .. }));
    }

    #[tokio::test]
    async fn test_market_outage_is_tolerated() {
        let h = harness(vec![breakout("m1", 0.001)], vec![]).await;
        h.market.set_failing(true);
        let report = h.bot.quick_scan(Utc::now()).await.unwrap();
        assert_eq!(report.candidates, 0);
        assert!(h.bot.rebalance(Utc::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_buy_changes_nothing() {
        use crate::ports::execution::MockTradeExecutor;

        let mut executor = MockTradeExecutor::new();
        executor
            .expect_buy()
            .times(1)
            .returning(|_, _, _| Err(ExecutionError::ExecutionFailed("route not found".into())));
        executor.expect_sell().never();

        let market = MockMarketData::new().with_candidates(vec![breakout("m1", 0.001)]);
        let store = Arc::new(MemoryStore::new());
        let (events, _) = event_channel();
        let deps = BotDeps {
            market: Arc::new(market),
            hivemind: Arc::new(Hivemind::new(HivemindConfig::default(), vec![])),
            executor: Arc::new(executor),
            store: store.clone(),
            evaluator: Arc::new(StrategyEvaluator::new(&StrategyParams::default())),
            events,
        };
        let bot = WalletBot::load(WALLET, deps, BotSettings::default(), HivemindStrategyConfig::baseline(Utc::now()))
            .await
            .unwrap();

        let report = bot.quick_scan(Utc::now()).await.unwrap();
        assert!(report.opened.is_empty());
        assert_eq!(report.failed, 1);

        let status = bot.status(Utc::now()).await;
        assert!(status.open_positions.is_empty());
        assert_eq!(status.cash_sol, 10.0);
        assert_eq!(status.trades_today, 0);
        assert!(store.all_positions(WALLET).await.is_empty());
    }

    #[test]
    fn test_entry_intent_precedence() {
        let config = HivemindStrategyConfig::baseline(Utc::now());
        let lifecycle = LifecycleConfig::default();
        let signal = StrategySignal {
            strategy: StrategyId::GridTrading,
            action: Action::Buy,
            confidence: 70.0,
            position_size_pct: 5.0,
            profit_target_pct: 3.0,
            stop_loss_pct: 6.0,
            reasoning: "dip".into(),
        };
        let empty = ConsensusResult::empty(0);
        let intent = entry_intent(&empty, Some(&signal), &config, &lifecycle).unwrap();
        assert_eq!(intent.source, SignalSource::StrategyBuy);
        assert!((intent.confidence - 0.7).abs() < 1e-9);
        assert!(entry_intent(&empty, None, &config, &lifecycle).is_none());
    }
}
