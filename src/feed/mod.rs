pub mod http;
pub mod replay;

pub use http::HttpPriceFeed;
pub use replay::ReplayFeed;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CandleSeries;

/// Source of recent price history for a symbol, oldest bar first.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_history(&self, symbol: &str, count: usize) -> Result<CandleSeries>;
}
