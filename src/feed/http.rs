use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::core::clock::{Clock, SystemClock};
use crate::feed::PriceFeed;
use crate::models::{Candle, CandleSeries, Timeframe};

/// Pause before the n-th retry is `RETRY_BACKOFF_MS * n`.
const RETRY_BACKOFF_MS: u64 = 500;

/// Prices arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Num {
    Float(f64),
    Text(String),
}

impl Num {
    fn value(&self) -> Option<f64> {
        match self {
            Num::Float(v) => Some(*v),
            Num::Text(s) => s.trim().parse().ok(),
        }
        .filter(|v: &f64| v.is_finite())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCandle {
    #[serde(alias = "timestamp", alias = "time")]
    epoch: i64,
    open: Num,
    high: Num,
    low: Num,
    close: Num,
    #[serde(default)]
    volume: Option<Num>,
}

#[derive(Debug, Deserialize)]
struct TickHistory {
    prices: Vec<Num>,
    #[serde(default)]
    times: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    Error { error: ErrorBody },
    Candles { candles: Vec<RawCandle> },
    Nested { history: TickHistory },
    Flat(TickHistory),
}

/// Turns a provider response body into a series. Close-only responses
/// without usable times are stamped backwards from `now`, one bar per
/// `interval`.
pub fn parse_history(body: &str, now: DateTime<Utc>, interval: Duration) -> Result<CandleSeries> {
    let response: HistoryResponse =
        serde_json::from_str(body).context("Malformed price history response")?;

    match response {
        HistoryResponse::Error { error } => bail!(
            "Price feed error {}: {}",
            error.code.as_deref().unwrap_or("unknown"),
            error.message.as_deref().unwrap_or("no message")
        ),
        HistoryResponse::Candles { candles } => {
            let bars: Vec<Candle> = candles
                .into_iter()
                .filter_map(|rc| {
                    Some(Candle {
                        timestamp: DateTime::from_timestamp(rc.epoch, 0)?,
                        open: rc.open.value()?,
                        high: rc.high.value()?,
                        low: rc.low.value()?,
                        close: rc.close.value()?,
                        volume: rc.volume.and_then(|v| v.value()).unwrap_or(0.0),
                    })
                })
                .collect();
            Ok(CandleSeries::normalized(bars))
        }
        HistoryResponse::Nested { history } | HistoryResponse::Flat(history) => {
            ticks_to_series(history, now, interval)
        }
    }
}

fn ticks_to_series(history: TickHistory, now: DateTime<Utc>, interval: Duration) -> Result<CandleSeries> {
    let closes: Vec<f64> = history.prices.iter().filter_map(Num::value).collect();
    if closes.len() != history.prices.len() {
        bail!("Price history contains non-numeric prices");
    }

    if history.times.len() == closes.len() && !closes.is_empty() {
        let bars: Vec<Candle> = history
            .times
            .iter()
            .zip(&closes)
            .filter_map(|(&t, &c)| Some(Candle::from_close(DateTime::from_timestamp(t, 0)?, c)))
            .collect();
        return Ok(CandleSeries::normalized(bars));
    }

    Ok(CandleSeries::from_closes(&closes, now, interval))
}

/// Fetches `GET {base_url}/history?symbol=..&count=..` and accepts any of
/// the response shapes understood by [`parse_history`].
pub struct HttpPriceFeed {
    client: Client,
    base_url: String,
    bar: Timeframe,
    retries: u32,
    clock: Arc<dyn Clock>,
}

impl HttpPriceFeed {
    pub fn new(base_url: &str, bar: Timeframe) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bar,
            retries: 1,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn fetch_once(&self, symbol: &str, count: usize) -> Result<CandleSeries> {
        let resp = self
            .client
            .get(format!("{}/history", self.base_url))
            .query(&[("symbol", symbol.to_string()), ("count", count.to_string())])
            .send()
            .await
            .context("Failed to fetch price history")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Price feed HTTP error {}: {}", status, body);
        }

        let body = resp.text().await.context("Failed to read price history")?;
        let interval = Duration::minutes(self.bar.as_minutes() as i64);
        parse_history(&body, self.clock.now(), interval)
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn fetch_history(&self, symbol: &str, count: usize) -> Result<CandleSeries> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(symbol, count).await {
                Ok(series) => return Ok(series.tail(count)),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!("{}: fetch attempt {} failed: {:#}", symbol, attempt, e);
                    tokio::time::sleep(std::time::Duration::from_millis(
                        RETRY_BACKOFF_MS * attempt as u64,
                    ))
                    .await;
                }
                Err(e) => return Err(e.context(format!("{} history unavailable", symbol))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::base_time;

    fn minute() -> Duration {
        Duration::minutes(1)
    }

    #[test]
    fn parses_flat_close_list() {
        let body = r#"{"prices": [1.1, "1.1002", 1.1001]}"#;
        let series = parse_history(body, base_time(), minute()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![1.1, 1.1002, 1.1001]);
        assert_eq!(series.last().unwrap().timestamp, base_time());
        assert_eq!(
            series.first().unwrap().timestamp,
            base_time() - Duration::minutes(2)
        );
        assert!(series.is_strictly_increasing());
    }

    #[test]
    fn parses_nested_ticks_with_times() {
        let body = r#"{"history": {"prices": ["1.2", "1.3"], "times": [1705320060, 1705320000]}}"#;
        let series = parse_history(body, base_time(), minute()).unwrap();
        assert_eq!(series.closes(), vec![1.3, 1.2]);
        assert_eq!(series.first().unwrap().timestamp.timestamp(), 1705320000);
    }

    #[test]
    fn parses_candles_newest_first() {
        let body = r#"{"candles": [
            {"epoch": 1705320060, "open": "1.10", "high": 1.12, "low": 1.09, "close": 1.11},
            {"epoch": 1705320000, "open": 1.08, "high": 1.11, "low": 1.07, "close": 1.10, "volume": 42}
        ]}"#;
        let series = parse_history(body, base_time(), minute()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![1.10, 1.11]);
        assert_eq!(series.volumes(), vec![42.0, 0.0]);
    }

    #[test]
    fn error_payload_is_an_error() {
        let body = r#"{"error": {"code": "MarketIsClosed", "message": "This market is presently closed."}}"#;
        let err = parse_history(body, base_time(), minute()).unwrap_err();
        assert!(format!("{:#}", err).contains("MarketIsClosed"));
    }

    #[test]
    fn malformed_bodies_are_errors() {
        assert!(parse_history("not json", base_time(), minute()).is_err());
        assert!(parse_history(r#"{"foo": 1}"#, base_time(), minute()).is_err());
        assert!(parse_history(r#"{"prices": ["abc"]}"#, base_time(), minute()).is_err());
    }
}
