use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(OrderSide::Buy),
            "SELL" => Ok(OrderSide::Sell),
            other => Err(format!("side must be BUY or SELL, got '{}'", other)),
        }
    }
}

/// Order variants the CLI can submit. Prices live on the variant that needs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit { price: Decimal },
    StopLimit { stop_price: Decimal, limit_price: Decimal },
}

impl OrderKind {
    /// Wire value of the `type` parameter. Binance futures calls a stop-limit order `STOP`.
    pub fn wire_type(&self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit { .. } => "LIMIT",
            OrderKind::StopLimit { .. } => "STOP",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderKind::Market => "Market",
            OrderKind::Limit { .. } => "Limit",
            OrderKind::StopLimit { .. } => "Stop-limit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub kind: OrderKind,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self::new(symbol, side, quantity, OrderKind::Market)
    }

    pub fn limit(symbol: &str, side: OrderSide, quantity: Decimal, price: Decimal) -> Self {
        Self::new(symbol, side, quantity, OrderKind::Limit { price })
    }

    pub fn stop_limit(
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self::new(
            symbol,
            side,
            quantity,
            OrderKind::StopLimit {
                stop_price,
                limit_price,
            },
        )
    }

    fn new(symbol: &str, side: OrderSide, quantity: Decimal, kind: OrderKind) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            quantity,
            kind,
        }
    }

    /// Request parameters in submission order, before timestamp and signature.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("side", self.side.as_str().to_string()),
            ("type", self.kind.wire_type().to_string()),
            ("quantity", self.quantity.normalize().to_string()),
        ];

        match self.kind {
            OrderKind::Market => {}
            OrderKind::Limit { price } => {
                params.push(("price", price.normalize().to_string()));
                params.push(("timeInForce", TIME_IN_FORCE_GTC.to_string()));
            }
            OrderKind::StopLimit {
                stop_price,
                limit_price,
            } => {
                params.push(("price", limit_price.normalize().to_string()));
                params.push(("stopPrice", stop_price.normalize().to_string()));
                params.push(("timeInForce", TIME_IN_FORCE_GTC.to_string()));
            }
        }

        params
    }
}

pub const TIME_IN_FORCE_GTC: &str = "GTC";

/// Order acknowledgement as returned by `POST /fapi/v1/order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: i64,
    pub status: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub orig_qty: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub time_in_force: Option<String>,
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Remaining fields are kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Subset of `GET /fapi/v2/account`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub total_wallet_balance: Decimal,
}

/// `GET /fapi/v1/ticker/price`; only the price is read.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub price: Decimal,
}

/// Total wallet balance in the account's margin asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balance(pub Decimal);

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        write!(f, "{:.2}", rounded)
    }
}
