use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;

use super::{ExchangeError, FuturesApi};
use crate::config::Config;
use crate::types::{AccountInfo, OrderRequest, OrderResult, TickerPrice};

pub const TESTNET_BASE_URL: &str = "https://testnet.binancefuture.com";
pub const MAINNET_BASE_URL: &str = "https://fapi.binance.com";

const ACCOUNT_PATH: &str = "/fapi/v2/account";
const TICKER_PRICE_PATH: &str = "/fapi/v1/ticker/price";
const ORDER_PATH: &str = "/fapi/v1/order";

/// Longest slice of an unexpected response body kept in errors.
const BODY_SNIPPET_LEN: usize = 200;

/// USDⓈ-M futures REST client. Signed endpoints use HMAC-SHA256 over the query string.
pub struct BinanceFuturesClient {
    client: Client,
    base_url: Url,
    api_secret: String,
    recv_window: u64,
}

/// Error payload Binance returns with 4xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

impl BinanceFuturesClient {
    pub fn new(
        api_key: &str,
        api_secret: &str,
        base_url: &str,
        recv_window: u64,
    ) -> Result<Self, ExchangeError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-MBX-APIKEY", HeaderValue::from_str(api_key)?);
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let client = Client::builder().default_headers(headers).build()?;
        let base_url =
            Url::parse(base_url).map_err(|_| ExchangeError::InvalidBaseUrl(base_url.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_secret: api_secret.to_string(),
            recv_window,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ExchangeError> {
        Self::new(
            &config.api_key,
            &config.api_secret,
            &config.base_url,
            config.recv_window,
        )
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ExchangeError> {
        self.base_url
            .join(path)
            .map_err(|_| ExchangeError::InvalidBaseUrl(self.base_url.to_string()))
    }

    fn public_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ExchangeError> {
        let mut url = self.endpoint(path)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn signed_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ExchangeError> {
        self.signed_url_at(path, params, Utc::now().timestamp_millis())
    }

    /// Appends `timestamp` and `recvWindow`, then signs the encoded query exactly as sent.
    fn signed_url_at(
        &self,
        path: &str,
        params: &[(&str, String)],
        timestamp: i64,
    ) -> Result<Url, ExchangeError> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("timestamp", &timestamp.to_string());
            pairs.append_pair("recvWindow", &self.recv_window.to_string());
        }

        let signature = self.sign(url.query().unwrap_or_default());
        url.query_pairs_mut().append_pair("signature", &signature);
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ExchangeError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

/// Maps an HTTP status and body onto the payload or a classified error.
fn decode_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ExchangeError> {
    if status.is_success() {
        return Ok(serde_json::from_str(body)?);
    }

    if status.is_client_error() {
        if let Ok(err) = serde_json::from_str::<ApiErrorBody>(body) {
            return Err(ExchangeError::Rejected {
                code: err.code,
                msg: err.msg,
            });
        }
    }

    Err(ExchangeError::Http {
        status: status.as_u16(),
        body: body.chars().take(BODY_SNIPPET_LEN).collect(),
    })
}

#[async_trait]
impl FuturesApi for BinanceFuturesClient {
    async fn account(&self) -> Result<AccountInfo, ExchangeError> {
        let url = self.signed_url(ACCOUNT_PATH, &[])?;
        self.execute(self.client.get(url)).await
    }

    async fn ticker_price(&self, symbol: &str) -> Result<TickerPrice, ExchangeError> {
        let url = self.public_url(TICKER_PRICE_PATH, &[("symbol", symbol.to_string())])?;
        self.execute(self.client.get(url)).await
    }

    async fn new_order(&self, order: &OrderRequest) -> Result<OrderResult, ExchangeError> {
        let url = self.signed_url(ORDER_PATH, &order.to_params())?;
        self.execute(self.client.post(url)).await
    }
}
