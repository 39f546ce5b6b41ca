use std::io;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;

use futures_cli::cli::Menu;
use futures_cli::config::{
    Args, Config, ConfigError, API_KEY_VAR, API_SECRET_VAR, TESTNET_SIGNUP_URL,
};
use futures_cli::exchange::binance::BinanceFuturesClient;
use futures_cli::logger::Logger;
use futures_cli::trading::TradingBot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = match Config::from_args(Args::parse()) {
        Ok(config) => config,
        Err(e @ ConfigError::MissingCredential { .. }) => {
            eprintln!("Cannot start: {}", e);
            eprintln!(
                "Set {} and {} in the environment or .env, or pass --api-key/--api-secret.",
                API_KEY_VAR, API_SECRET_VAR
            );
            eprintln!("Get free testnet credentials at {}", TESTNET_SIGNUP_URL);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let logger = Logger::open(&config.log_file, config.log_level)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;
    let client =
        BinanceFuturesClient::from_config(&config).context("failed to build futures client")?;

    let bot = TradingBot::new(client, logger, config.network);

    println!("Binance futures CLI ({})", config.network.label());
    Menu::new(&bot, io::stdin().lock(), io::stdout())
        .run()
        .await?;

    bot.logger().info("Session ended");
    Ok(())
}
