//! GigaBrain - multi-wallet Solana token trading decision engine

use anyhow::Result;
use gigabrain::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets (API keys, wallet keys) live in .env, not in the config file
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
