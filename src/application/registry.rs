//! Bot Registry
//!
//! Owns the running bots, at most one per wallet. Bots share nothing but
//! the provider clients and the store handle; each has its own state lock,
//! hivemind breakers and timers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::bot::{EngineError, WalletBot};
use super::scheduler::SchedulerHandle;
use crate::config::SchedulerSection;

struct RunningBot {
    bot: Arc<WalletBot>,
    scheduler: SchedulerHandle,
}

#[derive(Default)]
pub struct BotRegistry {
    bots: RwLock<HashMap<String, RunningBot>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the cycle timers for `bot`
    pub async fn spawn(&self, bot: Arc<WalletBot>, schedule: &SchedulerSection) -> Result<(), EngineError> {
        let mut bots = self.bots.write().await;
        let wallet = bot.wallet().to_string();
        if bots.contains_key(&wallet) {
            return Err(EngineError::AlreadyRunning(wallet));
        }
        let scheduler = SchedulerHandle::spawn(bot.clone(), schedule);
        tracing::info!("Started bot for {}", wallet);
        bots.insert(wallet, RunningBot { bot, scheduler });
        Ok(())
    }

    pub async fn get(&self, wallet: &str) -> Option<Arc<WalletBot>> {
        self.bots.read().await.get(wallet).map(|r| r.bot.clone())
    }

    pub async fn wallets(&self) -> Vec<String> {
        let mut wallets: Vec<String> = self.bots.read().await.keys().cloned().collect();
        wallets.sort();
        wallets
    }

    pub async fn len(&self) -> usize {
        self.bots.read().await.len()
    }

    /// Stop one bot. Returns false if it was not running.
    pub async fn stop(&self, wallet: &str) -> bool {
        let running = self.bots.write().await.remove(wallet);
        match running {
            Some(running) => {
                running.scheduler.stop().await;
                tracing::info!("Stopped bot for {}", wallet);
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let drained: Vec<(String, RunningBot)> = self.bots.write().await.drain().collect();
        for (wallet, running) in drained {
            running.scheduler.stop().await;
            tracing::info!("Stopped bot for {}", wallet);
        }
    }
}
