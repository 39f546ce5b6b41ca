pub mod binance;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{AccountInfo, OrderRequest, OrderResult, TickerPrice};

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange understood the request and refused it.
    #[error("code {code}: {msg}")]
    Rejected { code: i64, msg: String },
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid API key header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl ExchangeError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, ExchangeError::Rejected { .. })
    }
}

/// The three futures endpoints the trading façade needs.
#[async_trait]
pub trait FuturesApi: Send + Sync {
    async fn account(&self) -> Result<AccountInfo, ExchangeError>;
    async fn ticker_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError>;
    async fn new_order(&self, order: &OrderRequest) -> Result<OrderResult, ExchangeError>;
}
