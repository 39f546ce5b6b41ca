use std::path::PathBuf;

use clap::Parser;
use reqwest::Url;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::exchange::binance::{MAINNET_BASE_URL, TESTNET_BASE_URL};

pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";

/// Where to get practice credentials.
pub const TESTNET_SIGNUP_URL: &str = "https://testnet.binancefuture.com";

#[derive(Debug, Parser)]
#[command(name = "futures-cli")]
#[command(about = "Interactive command line for Binance USD-M futures")]
#[command(version)]
pub struct Args {
    /// API key
    #[arg(long, env = API_KEY_VAR, hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// API secret
    #[arg(long, env = API_SECRET_VAR, hide_env_values = true, default_value = "")]
    pub api_secret: String,

    /// Trade on the production exchange instead of the testnet
    #[arg(long, env = "BINANCE_MAINNET")]
    pub mainnet: bool,

    /// Override the REST base URL
    #[arg(long, env = "BINANCE_FUTURES_URL")]
    pub base_url: Option<String>,

    /// recvWindow sent with signed requests, in milliseconds
    #[arg(long, env = "BINANCE_RECV_WINDOW", default_value_t = 5000)]
    pub recv_window: u64,

    /// Append-only log file
    #[arg(long, env = "TRADING_BOT_LOG", default_value = "trading_bot.log")]
    pub log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TRADING_BOT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Network::Testnet => TESTNET_BASE_URL,
            Network::Mainnet => MAINNET_BASE_URL,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Network::Testnet => "TESTNET (practice mode)",
            Network::Mainnet => "MAINNET",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not set")]
    MissingCredential { var: &'static str },
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
    #[error("recvWindow must be between 1 and 60000 ms, got {0}")]
    InvalidRecvWindow(u64),
    #[error("log level must be one of trace, debug, info, warn, error; got '{0}'")]
    InvalidLogLevel(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    pub network: Network,
    pub base_url: String,
    pub recv_window: u64,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let api_key = require(args.api_key, API_KEY_VAR)?;
        let api_secret = require(args.api_secret, API_SECRET_VAR)?;

        let network = if args.mainnet {
            Network::Mainnet
        } else {
            Network::Testnet
        };

        let base_url = args
            .base_url
            .unwrap_or_else(|| network.default_base_url().to_string());
        if Url::parse(&base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        // Binance caps recvWindow at 60 seconds.
        if args.recv_window == 0 || args.recv_window > 60_000 {
            return Err(ConfigError::InvalidRecvWindow(args.recv_window));
        }

        let log_level = parse_log_level(&args.log_level)?;

        Ok(Self {
            api_key,
            api_secret,
            network,
            base_url,
            recv_window: args.recv_window,
            log_file: args.log_file,
            log_level,
        })
    }
}

fn require(value: String, var: &'static str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::MissingCredential { var });
    }
    Ok(value.to_string())
}

/// Error lines must always reach the log, so `off` is refused along with unknown names.
fn parse_log_level(value: &str) -> Result<LevelFilter, ConfigError> {
    match value.trim().parse::<LevelFilter>() {
        Ok(level) if level != LevelFilter::OFF => Ok(level),
        _ => Err(ConfigError::InvalidLogLevel(value.to_string())),
    }
}
