//! CLI Command Handlers
//!
//! Paper-trading runs and per-wallet administration for the GigaBrain engine.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use super::wiring::Services;
use crate::application::{run_cycle, BotRegistry, BotStatus, Cycle};
use crate::config::{load_config, Config, ConfigError};

/// GigaBrain - multi-wallet Solana token trading decision engine
#[derive(Parser, Debug)]
#[command(
    name = "gigabrain",
    version = env!("CARGO_PKG_VERSION"),
    about = "Multi-wallet Solana token trading decision engine",
    long_about = "GigaBrain screens candidate tokens for manipulation, asks a panel of AI \
                  advisors for a consensus, blends it with deterministic strategies and \
                  manages every position through its exit under portfolio-wide risk limits."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "config/gigabrain.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one bot per configured wallet until Ctrl+C
    Run(RunCmd),

    /// Show portfolio, positions and provider health
    Status(StatusCmd),

    /// Manage a wallet's token blacklist
    #[command(subcommand)]
    Blacklist(BlacklistCmd),

    /// Regenerate a wallet's strategy thresholds from its journal
    Recalibrate(WalletArg),

    /// Check the configuration file and exit
    ValidateConfig,
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Run every cycle once per wallet, print status and exit
    #[arg(long)]
    pub once: bool,

    /// Only run these wallets (default: all configured)
    #[arg(short, long, value_name = "WALLET")]
    pub wallet: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Wallet to report on (default: all configured)
    #[arg(short, long, value_name = "WALLET")]
    pub wallet: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, value_name = "FORMAT", default_value = "text")]
    pub format: String,
}

#[derive(Parser, Debug)]
pub struct WalletArg {
    /// Wallet address
    #[arg(value_name = "WALLET")]
    pub wallet: String,
}

#[derive(Subcommand, Debug)]
pub enum BlacklistCmd {
    /// Exclude a token from all future trading for a wallet
    Add {
        #[arg(value_name = "WALLET")]
        wallet: String,
        #[arg(value_name = "MINT")]
        mint: String,
        /// Why the token is excluded
        #[arg(short, long, default_value = "manual")]
        reason: String,
    },
    /// Allow a token again
    Remove {
        #[arg(value_name = "WALLET")]
        wallet: String,
        #[arg(value_name = "MINT")]
        mint: String,
    },
    /// List blacklisted tokens
    List(WalletArg),
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let loaded = load_config(&app.config);
    let configured = loaded.as_ref().ok().and_then(|c| c.logging.directive());
    init_logging(app.verbose, app.debug, configured)?;

    match app.command {
        Command::ValidateConfig => validate_command(&app.config, loaded),
        Command::Run(cmd) => run_command(&services(&app.config, loaded)?, cmd).await,
        Command::Status(cmd) => status_command(&services(&app.config, loaded)?, cmd).await,
        Command::Blacklist(cmd) => blacklist_command(&services(&app.config, loaded)?, cmd).await,
        Command::Recalibrate(arg) => recalibrate_command(&services(&app.config, loaded)?, arg).await,
    }
}

fn services(path: &Path, loaded: Result<Config, ConfigError>) -> Result<Services> {
    let config = loaded.with_context(|| format!("Failed to load configuration {}", path.display()))?;
    Services::from_config(config)
}

/// Initialize logging system. Flags win over `RUST_LOG`, which wins over
/// the configured level.
fn init_logging(verbose: bool, debug: bool, configured: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured.unwrap_or("info")))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))?;

    Ok(())
}

fn selected_wallets(config: &Config, only: &[String]) -> Result<Vec<String>> {
    let wallets = if only.is_empty() {
        config.engine.resolve_wallets()
    } else {
        only.to_vec()
    };
    if wallets.is_empty() {
        bail!(
            "No wallets configured: set [engine].wallets or {}",
            crate::config::WALLETS_ENV
        );
    }
    Ok(wallets)
}

async fn run_command(services: &Services, cmd: RunCmd) -> Result<()> {
    let config = services.config();
    let wallets = selected_wallets(config, &cmd.wallet)?;
    tracing::warn!("PAPER TRADING MODE - fills are simulated");

    let mut bots = Vec::new();
    for wallet in &wallets {
        match services.bot(wallet).await {
            Ok(bot) => bots.push(bot),
            Err(e) => tracing::error!("Skipping wallet {}: {:#}", wallet, e),
        }
    }
    if bots.is_empty() {
        bail!("No bot could be started");
    }

    if cmd.once {
        for bot in &bots {
            for cycle in Cycle::ALL {
                run_cycle(bot, cycle).await;
            }
            print_status(&bot.status(Utc::now()).await);
        }
        return Ok(());
    }

    let mut events = services.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::debug!("event: {}", json),
                    Err(e) => tracing::warn!("Unserialisable {} event: {}", event.kind(), e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event log lagged, {} events dropped", n)
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let registry = BotRegistry::new();
    for bot in bots {
        registry.spawn(bot, &config.scheduler).await?;
    }
    tracing::info!("Running {} bot(s), Ctrl+C to stop", registry.len().await);

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    tracing::info!("Shutdown signal received");
    registry.stop_all().await;
    tracing::info!("GigaBrain stopped");
    Ok(())
}

async fn status_command(services: &Services, cmd: StatusCmd) -> Result<()> {
    let only: Vec<String> = cmd.wallet.into_iter().collect();
    let wallets = selected_wallets(services.config(), &only)?;

    let mut statuses = Vec::new();
    for wallet in &wallets {
        statuses.push(services.bot(wallet).await?.status(Utc::now()).await);
    }

    match cmd.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&statuses)?),
        _ => statuses.iter().for_each(print_status),
    }
    Ok(())
}

fn print_status(status: &BotStatus) {
    println!("Wallet: {}", status.wallet);
    println!(
        "  Value: {:.4} SOL (cash {:.4}, peak {:.4}, drawdown {:.1}%{})",
        status.total_value_sol,
        status.cash_sol,
        status.peak_value_sol,
        status.drawdown_pct,
        if status.drawdown_paused { ", PAUSED" } else { "" }
    );
    println!(
        "  Strategy: {} / {:?}, min confidence {:.2}{}",
        status.strategy_config.market_sentiment,
        status.strategy_config.risk_level,
        status.strategy_config.min_confidence,
        if status.config_expired { " (expired)" } else { "" }
    );
    println!("  Trades today: {}, blacklisted: {}", status.trades_today, status.blacklisted);
    for p in &status.open_positions {
        println!(
            "  {:<10} {:?} {:.4} SOL via {} ({:+.1}%)",
            p.symbol,
            p.mode,
            p.amount_sol,
            p.strategy,
            p.current_pnl_pct()
        );
    }
    for provider in &status.providers {
        let breaker = &provider.breaker;
        println!(
            "  Provider {} ({}): {} [{} consecutive failures{}]",
            provider.id,
            provider.tier,
            breaker.status.description(),
            breaker.consecutive_failures,
            breaker
                .cooldown_remaining_secs
                .map(|secs| format!(", {}s cooldown", secs))
                .unwrap_or_default()
        );
    }
}

async fn blacklist_command(services: &Services, cmd: BlacklistCmd) -> Result<()> {
    match cmd {
        BlacklistCmd::Add { wallet, mint, reason } => {
            let bot = services.bot(&wallet).await?;
            if bot.add_blacklist(&mint, reason, Utc::now()).await? {
                println!("Blacklisted {} for {}", mint, wallet);
            } else {
                println!("{} was already blacklisted", mint);
            }
        }
        BlacklistCmd::Remove { wallet, mint } => {
            let bot = services.bot(&wallet).await?;
            if bot.remove_blacklist(&mint).await? {
                println!("Removed {} from {}'s blacklist", mint, wallet);
            } else {
                println!("{} was not blacklisted", mint);
            }
        }
        BlacklistCmd::List(arg) => {
            let bot = services.bot(&arg.wallet).await?;
            let mut entries = bot.blacklist().await;
            entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            if entries.is_empty() {
                println!("No blacklisted tokens");
            }
            for e in entries {
                println!(
                    "{}  {:?}  {:?}  {}  {}",
                    e.token_mint,
                    e.severity,
                    e.added_by,
                    e.created_at.format("%Y-%m-%d %H:%M"),
                    e.reason
                );
            }
        }
    }
    Ok(())
}

async fn recalibrate_command(services: &Services, arg: WalletArg) -> Result<()> {
    let bot = services.bot(&arg.wallet).await?;
    let config = bot.recalibrate(Utc::now()).await?;
    println!(
        "Recalibrated {}: {} / {:?}, budget {:.1}%, min confidence {:.2}, valid until {}",
        arg.wallet,
        config.market_sentiment,
        config.risk_level,
        config.budget_per_trade_pct,
        config.min_confidence,
        config.valid_until
    );
    Ok(())
}

fn validate_command(path: &Path, loaded: Result<Config, ConfigError>) -> Result<()> {
    let config = loaded.with_context(|| format!("Invalid configuration {}", path.display()))?;
    println!("Configuration OK: {}", path.display());
    println!("  Wallets: {}", config.engine.resolve_wallets().len());
    println!(
        "  Providers: {} enabled",
        config.hivemind.providers.iter().filter(|p| p.enabled).count()
    );
    println!("  Snapshot: {}", config.data.snapshot);
    Ok(())
}
