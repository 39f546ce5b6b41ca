use rust_decimal::Decimal;

use crate::config::Network;
use crate::exchange::{ExchangeError, FuturesApi};
use crate::logger::Logger;
use crate::types::{Balance, OrderRequest, OrderResult, OrderSide};

/// Result of a single façade call.
///
/// Failures never escape as errors. The variant says whether the exchange
/// refused the request or the request never got a usable answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Rejected { code: i64, message: String },
    Failed { reason: String },
}

impl<T> Outcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl<T> From<ExchangeError> for Outcome<T> {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Rejected { code, msg } => Outcome::Rejected { code, message: msg },
            other => Outcome::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// Maps user intents onto single futures API calls and logs every result.
pub struct TradingBot<A> {
    api: A,
    logger: Logger,
}

impl<A: FuturesApi> TradingBot<A> {
    pub fn new(api: A, logger: Logger, network: Network) -> Self {
        logger.info(format_args!("Trading bot initialized on {}", network.label()));
        Self { api, logger }
    }

    #[cfg(test)]
    pub(crate) fn api(&self) -> &A {
        &self.api
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn get_balance(&self) -> Outcome<Balance> {
        match self.api.account().await {
            Ok(account) => {
                let balance = Balance(account.total_wallet_balance);
                self.logger
                    .info(format_args!("Account balance: {} USDT", balance));
                Outcome::Success(balance)
            }
            Err(e) => {
                self.logger
                    .error(format_args!("Could not get account info: {}", e));
                e.into()
            }
        }
    }

    pub async fn get_price(&self, symbol: &str) -> Outcome<Decimal> {
        match self.api.ticker_price(symbol).await {
            Ok(ticker) => {
                self.logger
                    .info(format_args!("{} price: {}", symbol, ticker.price));
                Outcome::Success(ticker.price)
            }
            Err(e) => {
                self.logger
                    .error(format_args!("Could not get price for {}: {}", symbol, e));
                e.into()
            }
        }
    }

    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> Outcome<OrderResult> {
        self.submit(OrderRequest::market(symbol, side, quantity))
            .await
    }

    /// Resting order, good till cancelled.
    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Outcome<OrderResult> {
        self.submit(OrderRequest::limit(symbol, side, quantity, price))
            .await
    }

    /// Limit order at `limit_price` that activates once `stop_price` trades.
    pub async fn place_stop_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Outcome<OrderResult> {
        self.submit(OrderRequest::stop_limit(
            symbol,
            side,
            quantity,
            stop_price,
            limit_price,
        ))
        .await
    }

    async fn submit(&self, order: OrderRequest) -> Outcome<OrderResult> {
        let label = order.kind.label();
        match self.api.new_order(&order).await {
            Ok(result) => {
                self.logger.info(format_args!(
                    "{} order placed: {} {} {} | order id {} | status {}",
                    label, order.side, order.quantity, order.symbol, result.order_id, result.status
                ));
                Outcome::Success(result)
            }
            Err(e) if e.is_rejection() => {
                self.logger.error(format_args!(
                    "{} order rejected by exchange: {}",
                    label, e
                ));
                e.into()
            }
            Err(e) => {
                self.logger.error(format_args!(
                    "Unexpected error placing {} order: {}",
                    label.to_lowercase(),
                    e
                ));
                e.into()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::exchange::{ExchangeError, FuturesApi};
    use crate::types::{AccountInfo, OrderRequest, OrderResult, TickerPrice};

    pub enum Reply {
        Json(Value),
        Reject(i64, &'static str),
        Unreachable,
    }

    /// Answers every call with the same canned reply and records submitted orders.
    pub struct StubApi {
        reply: Reply,
        pub calls: Mutex<usize>,
        pub orders: Mutex<Vec<OrderRequest>>,
    }

    impl StubApi {
        pub fn new(reply: Reply) -> Self {
            Self {
                reply,
                calls: Mutex::new(0),
                orders: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        async fn respond<T: serde::de::DeserializeOwned>(&self) -> Result<T, ExchangeError> {
            *self.calls.lock().unwrap() += 1;
            match &self.reply {
                Reply::Json(value) => Ok(serde_json::from_value(value.clone())?),
                Reply::Reject(code, msg) => Err(ExchangeError::Rejected {
                    code: *code,
                    msg: msg.to_string(),
                }),
                Reply::Unreachable => Err(connection_refused().await),
            }
        }
    }

    /// A real transport error from a port nothing listens on.
    pub async fn connection_refused() -> ExchangeError {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        ExchangeError::Transport(err)
    }

    #[async_trait]
    impl FuturesApi for StubApi {
        async fn account(&self) -> Result<AccountInfo, ExchangeError> {
            self.respond().await
        }

        async fn ticker_price(&self, _symbol: &str) -> Result<TickerPrice, ExchangeError> {
            self.respond().await
        }

        async fn new_order(&self, order: &OrderRequest) -> Result<OrderResult, ExchangeError> {
            self.orders.lock().unwrap().push(order.clone());
            self.respond().await
        }
    }
}
