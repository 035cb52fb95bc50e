//! Cycle Scheduler
//!
//! Drives one bot's five periodic cycles on independent timers. Each timer
//! starts after a random jitter so bots spawned together do not hit the
//! market data and AI providers in lockstep. A failing cycle is logged and
//! the timer keeps going.

use chrono::Utc;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::bot::WalletBot;
use crate::config::SchedulerSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    QuickScan,
    DeepScan,
    Monitor,
    Rebalance,
    Recalibrate,
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cycle::QuickScan => "quick-scan",
            Cycle::DeepScan => "deep-scan",
            Cycle::Monitor => "monitor",
            Cycle::Rebalance => "rebalance",
            Cycle::Recalibrate => "recalibrate",
        };
        write!(f, "{}", s)
    }
}

impl Cycle {
    pub const ALL: [Cycle; 5] = [
        Cycle::QuickScan,
        Cycle::DeepScan,
        Cycle::Monitor,
        Cycle::Rebalance,
        Cycle::Recalibrate,
    ];

    pub fn period(&self, schedule: &SchedulerSection) -> Duration {
        let secs = match self {
            Cycle::QuickScan => schedule.quick_scan_secs,
            Cycle::DeepScan => schedule.deep_scan_secs,
            Cycle::Monitor => schedule.monitor_secs,
            Cycle::Rebalance => schedule.rebalance_secs,
            Cycle::Recalibrate => schedule.recalibration_secs,
        };
        Duration::from_secs(secs.max(1))
    }
}

/// Run one cycle now, logging instead of propagating failures
pub async fn run_cycle(bot: &WalletBot, cycle: Cycle) {
    let now = Utc::now();
    let outcome = match cycle {
        Cycle::QuickScan => bot.quick_scan(now).await.map(|_| ()),
        Cycle::DeepScan => bot.deep_scan(now).await.map(|_| ()),
        Cycle::Monitor => bot.monitor_positions(now).await.map(|_| ()),
        Cycle::Rebalance => bot.rebalance(now).await.map(|_| ()),
        Cycle::Recalibrate => bot.recalibrate(now).await.map(|_| ()),
    };
    if let Err(e) = outcome {
        tracing::error!("[{}] {} cycle failed: {}", bot.wallet(), cycle, e);
    }
}

/// Running timers for one bot
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Spawn all cycle timers for `bot`
    pub fn spawn(bot: Arc<WalletBot>, schedule: &SchedulerSection) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let tasks = Cycle::ALL
            .iter()
            .map(|&cycle| {
                let jitter = match schedule.start_jitter_ms {
                    0 => Duration::ZERO,
                    max => Duration::from_millis(rand::thread_rng().gen_range(0..=max)),
                };
                tokio::spawn(cycle_loop(bot.clone(), cycle, cycle.period(schedule), jitter, rx.clone()))
            })
            .collect();

        Self { shutdown, tasks }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Signal every timer and wait for in-flight cycles to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("Cycle task ended abnormally: {}", e);
            }
        }
    }
}

async fn cycle_loop(
    bot: Arc<WalletBot>,
    cycle: Cycle,
    period: Duration,
    jitter: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = tokio::time::sleep(jitter) => {}
        _ = shutdown.changed() => return,
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::debug!("[{}] {} every {:?}", bot.wallet(), cycle, period);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_cycle(&bot, cycle).await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::debug!("[{}] {} stopped", bot.wallet(), cycle);
                    return;
                }
            }
        }
    }
}
