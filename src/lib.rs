//! Interactive command line for Binance USDⓈ-M futures.
//!
//! - `config`: command line / environment configuration
//! - `logger`: console and append-only file log sink
//! - `exchange`: futures REST client behind the `FuturesApi` trait
//! - `trading`: `TradingBot`, one exchange call per user command
//! - `cli`: numbered menu and input validation

pub mod cli;
pub mod config;
pub mod exchange;
pub mod logger;
pub mod trading;
pub mod types;
