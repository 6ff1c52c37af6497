use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::feed::PriceFeed;
use crate::models::CandleSeries;

/// Serves pre-loaded series from memory. Symbols can be made slow or
/// failing to exercise the orchestrator's timeout and error paths.
#[derive(Debug, Default)]
pub struct ReplayFeed {
    data: HashMap<String, CandleSeries>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl ReplayFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, series: CandleSeries) -> Self {
        self.data.insert(symbol.to_string(), series);
        self
    }

    /// Every fetch for `symbol` sleeps for `delay` before answering.
    pub fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for ReplayFeed {
    async fn fetch_history(&self, symbol: &str, count: usize) -> Result<CandleSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(symbol) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(symbol) {
            return Err(anyhow!("{}: simulated feed failure", symbol));
        }

        self.data
            .get(symbol)
            .map(|series| series.tail(count))
            .ok_or_else(|| anyhow!("No history loaded for {}", symbol))
    }
}
