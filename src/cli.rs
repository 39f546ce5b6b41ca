use std::io::{self, BufRead, Write};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::exchange::FuturesApi;
use crate::trading::{Outcome, TradingBot};
use crate::types::{OrderResult, OrderSide};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("symbol must not be empty")]
    EmptySymbol,
    #[error("symbol must be letters and digits only, got '{0}'")]
    InvalidSymbol(String),
    #[error("{0}")]
    Side(String),
    #[error("{field} must be a number, got '{value}'")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

pub fn parse_symbol(input: &str) -> Result<String, InputError> {
    let symbol = input.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return Err(InputError::EmptySymbol);
    }
    if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(InputError::InvalidSymbol(symbol));
    }
    Ok(symbol)
}

pub fn parse_side(input: &str) -> Result<OrderSide, InputError> {
    input.parse().map_err(InputError::Side)
}

pub fn parse_positive(input: &str, field: &'static str) -> Result<Decimal, InputError> {
    let value = input.trim();
    let number: Decimal = value.parse().map_err(|_| InputError::NotANumber {
        field,
        value: value.to_string(),
    })?;
    if number <= Decimal::ZERO {
        return Err(InputError::NotPositive { field });
    }
    Ok(number)
}

const MENU: &str = "\
1. Check account balance
2. Get current price
3. Place market order
4. Place limit order
5. Place stop-limit order
6. Exit";

/// Fields collected for one order before anything is sent.
struct OrderInput {
    symbol: String,
    side: OrderSide,
    quantity: Decimal,
}

/// Numbered menu over a `TradingBot`. Reads lines from `input` until choice 6 or EOF.
pub struct Menu<'a, A, R, W> {
    bot: &'a TradingBot<A>,
    input: R,
    output: W,
}

impl<'a, A, R, W> Menu<'a, A, R, W>
where
    A: FuturesApi,
    R: BufRead,
    W: Write,
{
    pub fn new(bot: &'a TradingBot<A>, input: R, output: W) -> Self {
        Self { bot, input, output }
    }

    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output, "\n{}", MENU)?;
            let Some(choice) = self.prompt("Choose an option (1-6): ")? else {
                break;
            };

            let handled = match choice.as_str() {
                "1" => self.balance().await,
                "2" => self.price().await,
                "3" => self.market_order().await,
                "4" => self.limit_order().await,
                "5" => self.stop_limit_order().await,
                "6" => {
                    writeln!(self.output, "Goodbye!")?;
                    break;
                }
                _ => {
                    writeln!(self.output, "Invalid choice")?;
                    continue;
                }
            };

            match handled {
                Ok(Step::Continue) => {}
                Ok(Step::EndOfInput) => break,
                Err(Failure::Input(e)) => {
                    writeln!(self.output, "Invalid input: {}", e)?;
                }
                Err(Failure::Io(e)) => return Err(e),
            }
        }
        Ok(())
    }

    async fn balance(&mut self) -> Result<Step, Failure> {
        let outcome = self.bot.get_balance().await;
        match &outcome {
            Outcome::Success(balance) => {
                writeln!(self.output, "Balance: {} USDT", balance)?;
            }
            _ => self.report_failure(&outcome)?,
        }
        Ok(Step::Continue)
    }

    async fn price(&mut self) -> Result<Step, Failure> {
        let Some(symbol) = self.read_symbol()? else {
            return Ok(Step::EndOfInput);
        };
        let outcome = self.bot.get_price(&symbol).await;
        match &outcome {
            Outcome::Success(price) => writeln!(self.output, "{} price: {}", symbol, price)?,
            _ => self.report_failure(&outcome)?,
        }
        Ok(Step::Continue)
    }

    async fn market_order(&mut self) -> Result<Step, Failure> {
        let Some(order) = self.read_order()? else {
            return Ok(Step::EndOfInput);
        };
        let outcome = self
            .bot
            .place_market_order(&order.symbol, order.side, order.quantity)
            .await;
        self.report_order(&outcome)?;
        Ok(Step::Continue)
    }

    async fn limit_order(&mut self) -> Result<Step, Failure> {
        let Some(order) = self.read_order()? else {
            return Ok(Step::EndOfInput);
        };
        let Some(price) = self.read_positive("Limit price: ", "price")? else {
            return Ok(Step::EndOfInput);
        };
        let outcome = self
            .bot
            .place_limit_order(&order.symbol, order.side, order.quantity, price)
            .await;
        self.report_order(&outcome)?;
        Ok(Step::Continue)
    }

    async fn stop_limit_order(&mut self) -> Result<Step, Failure> {
        let Some(order) = self.read_order()? else {
            return Ok(Step::EndOfInput);
        };
        let Some(stop_price) = self.read_positive("Stop price: ", "stop price")? else {
            return Ok(Step::EndOfInput);
        };
        let Some(limit_price) = self.read_positive("Limit price: ", "limit price")? else {
            return Ok(Step::EndOfInput);
        };
        let outcome = self
            .bot
            .place_stop_limit_order(
                &order.symbol,
                order.side,
                order.quantity,
                stop_price,
                limit_price,
            )
            .await;
        self.report_order(&outcome)?;
        Ok(Step::Continue)
    }

    fn read_order(&mut self) -> Result<Option<OrderInput>, Failure> {
        let Some(symbol) = self.read_symbol()? else {
            return Ok(None);
        };
        let Some(side) = self.prompt("Side (BUY/SELL): ")? else {
            return Ok(None);
        };
        let side = parse_side(&side)?;
        let Some(quantity) = self.read_positive("Quantity: ", "quantity")? else {
            return Ok(None);
        };
        Ok(Some(OrderInput {
            symbol,
            side,
            quantity,
        }))
    }

    fn read_symbol(&mut self) -> Result<Option<String>, Failure> {
        match self.prompt("Symbol (e.g. BTCUSDT): ")? {
            Some(line) => Ok(Some(parse_symbol(&line)?)),
            None => Ok(None),
        }
    }

    fn read_positive(
        &mut self,
        label: &str,
        field: &'static str,
    ) -> Result<Option<Decimal>, Failure> {
        match self.prompt(label)? {
            Some(line) => Ok(Some(parse_positive(&line, field)?)),
            None => Ok(None),
        }
    }

    /// Prints `label` and reads one trimmed line. `None` at end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        // Invalid UTF-8 becomes replacement characters and fails parsing like any other bad input.
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }

    fn report_order(&mut self, outcome: &Outcome<OrderResult>) -> io::Result<()> {
        match outcome {
            Outcome::Success(order) => writeln!(
                self.output,
                "Order placed: id {} status {}",
                order.order_id, order.status
            ),
            _ => self.report_failure(outcome),
        }
    }

    fn report_failure<T>(&mut self, outcome: &Outcome<T>) -> io::Result<()> {
        match outcome {
            Outcome::Success(_) => Ok(()),
            Outcome::Rejected { code, message } => writeln!(
                self.output,
                "Rejected by exchange ({}): {}",
                code, message
            ),
            Outcome::Failed { reason } => writeln!(self.output, "Request failed: {}", reason),
        }
    }
}

enum Step {
    Continue,
    EndOfInput,
}

enum Failure {
    Input(InputError),
    Io(io::Error),
}

impl From<InputError> for Failure {
    fn from(e: InputError) -> Self {
        Failure::Input(e)
    }
}

impl From<io::Error> for Failure {
    fn from(e: io::Error) -> Self {
        Failure::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::logger::testing::capturing_logger;
    use crate::trading::testing::{Reply, StubApi};
    use rust_decimal_macros::dec;
    use serde_json::json;

    async fn run_session(reply: Reply, script: &str) -> (TradingBot<StubApi>, String) {
        let (logger, _captured) = capturing_logger();
        let bot = TradingBot::new(StubApi::new(reply), logger, Network::Testnet);
        let mut output = Vec::new();
        Menu::new(&bot, script.as_bytes(), &mut output)
            .run()
            .await
            .unwrap();
        (bot, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parses_positive_decimals() {
        assert_eq!(parse_positive(" 1.5 ", "quantity"), Ok(dec!(1.5)));
        assert_eq!(
            parse_positive("abc", "quantity"),
            Err(InputError::NotANumber {
                field: "quantity",
                value: "abc".to_string()
            })
        );
        assert_eq!(
            parse_positive("0", "price"),
            Err(InputError::NotPositive { field: "price" })
        );
        assert_eq!(
            parse_positive("-2", "price"),
            Err(InputError::NotPositive { field: "price" })
        );
    }

    #[test]
    fn symbol_is_normalised() {
        assert_eq!(parse_symbol(" btcusdt\n"), Ok("BTCUSDT".to_string()));
        assert_eq!(parse_symbol("   "), Err(InputError::EmptySymbol));
        assert_eq!(
            parse_symbol("BTC/USDT"),
            Err(InputError::InvalidSymbol("BTC/USDT".to_string()))
        );
    }

    #[tokio::test]
    async fn non_numeric_quantity_never_reaches_the_exchange() {
        let (bot, output) = run_session(
            Reply::Json(json!({ "orderId": 1, "status": "NEW" })),
            "3\nETHUSDT\nBUY\nabc\n6\n",
        )
        .await;

        assert_eq!(bot_calls(&bot), 0);
        assert!(output.contains("Invalid input: quantity must be a number, got 'abc'"));
        assert!(output.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn unknown_side_is_reported_and_menu_repeats() {
        let (bot, output) = run_session(
            Reply::Json(json!({ "orderId": 1, "status": "NEW" })),
            "4\nETHUSDT\nHOLD\n6\n",
        )
        .await;

        assert_eq!(bot_calls(&bot), 0);
        assert!(output.contains("Invalid input: side must be BUY or SELL, got 'HOLD'"));
        assert_eq!(output.matches("6. Exit").count(), 2);
    }

    #[tokio::test]
    async fn market_order_round_trip() {
        let (bot, output) = run_session(
            Reply::Json(json!({ "orderId": 42, "status": "FILLED" })),
            "3\nethusdt\nbuy\n1.5\n6\n",
        )
        .await;

        assert_eq!(bot_calls(&bot), 1);
        assert!(output.contains("Order placed: id 42 status FILLED"));
    }

    #[tokio::test]
    async fn stop_limit_prompts_for_both_prices() {
        let (bot, output) = run_session(
            Reply::Json(json!({ "orderId": 5, "status": "NEW" })),
            "5\nBTCUSDT\nSELL\n0.1\n60000\n59900\n6\n",
        )
        .await;

        assert!(output.contains("Stop price: "));
        assert!(output.contains("Limit price: "));
        assert_eq!(bot_calls(&bot), 1);
    }

    #[tokio::test]
    async fn rejection_is_shown_to_the_user() {
        let (_bot, output) =
            run_session(Reply::Reject(-1121, "Invalid symbol."), "2\nNOPE\n6\n").await;
        assert!(output.contains("Rejected by exchange (-1121): Invalid symbol."));
    }

    #[tokio::test]
    async fn invalid_choice_and_end_of_input() {
        let (bot, output) =
            run_session(Reply::Json(json!({ "totalWalletBalance": "1" })), "9\n1\n").await;

        assert!(output.contains("Invalid choice"));
        assert!(output.contains("Balance: 1.00 USDT"));
        assert_eq!(bot_calls(&bot), 1);
        assert!(!output.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn price_lookup_prints_the_price() {
        let (bot, output) = run_session(
            Reply::Json(json!({ "symbol": "BTCUSDT", "price": "65000.50" })),
            "2\nbtcusdt\n6\n",
        )
        .await;

        assert_eq!(bot_calls(&bot), 1);
        assert!(output.contains("BTCUSDT price: 65000.50"));
    }

    #[tokio::test]
    async fn limit_order_prints_the_acknowledgement() {
        let (bot, output) = run_session(
            Reply::Json(json!({ "orderId": 77, "status": "NEW", "timeInForce": "GTC" })),
            "4\nBTCUSDT\nSELL\n0.01\n70000\n6\n",
        )
        .await;

        assert!(output.contains("Limit price: "));
        assert!(output.contains("Order placed: id 77 status NEW"));

        let sent = bot.api().orders.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![crate::types::OrderRequest::limit(
                "BTCUSDT",
                OrderSide::Sell,
                dec!(0.01),
                dec!(70000)
            )]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_reported_and_session_continues() {
        let (logger, _captured) = capturing_logger();
        let bot = TradingBot::new(
            StubApi::new(Reply::Json(json!({ "orderId": 1, "status": "NEW" }))),
            logger,
            Network::Testnet,
        );
        let script: &[u8] = b"3\nETHUSDT\nBUY\n\xff\xfe\n6\n";
        let mut output = Vec::new();
        Menu::new(&bot, script, &mut output).run().await.unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_eq!(bot_calls(&bot), 0);
        assert!(output.contains("Invalid input: quantity must be a number"));
        assert!(output.contains("Goodbye!"));
    }

    fn bot_calls(bot: &TradingBot<StubApi>) -> usize {
        bot.api().call_count()
    }
}
