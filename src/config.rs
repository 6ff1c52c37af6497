use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::Timeframe;
use crate::strategies::scorer::ScoringMode;

/// Majors in both regular and OTC form, then the regular crosses.
#[rustfmt::skip]
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "frxEURUSD", "OTC_EURUSD",
    "frxGBPUSD", "OTC_GBPUSD",
    "frxUSDJPY", "OTC_USDJPY",
    "frxAUDUSD", "OTC_AUDUSD",
    "frxUSDCAD", "OTC_USDCAD",
    "frxUSDCHF", "OTC_USDCHF",
    "frxNZDUSD", "OTC_NZDUSD",
    "frxEURGBP", "frxEURJPY", "frxEURCHF", "frxEURAUD", "frxEURCAD", "frxEURNZD",
    "frxGBPJPY", "frxGBPCHF", "frxGBPAUD", "frxGBPCAD", "frxGBPNZD",
    "frxAUDJPY", "frxAUDCAD", "frxAUDCHF", "frxAUDNZD",
    "frxCADJPY", "frxCADCHF", "frxCHFJPY",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market data
    pub symbols: Vec<String>,
    pub price_feed_url: String,
    pub history_bars: usize,
    pub bar: Timeframe,
    pub fetch_retries: u32,

    // Scoring
    pub scoring_mode: ScoringMode,

    // Cycle
    pub cycle_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_concurrency: usize,

    // Persistence
    pub state_dir: String,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing or unparseable
    /// values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let symbols: Vec<String> = env("SYMBOLS", "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        let symbols = if symbols.is_empty() {
            DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
        } else {
            symbols
        };

        Config {
            symbols,
            price_feed_url: env("PRICE_FEED_URL", "http://localhost:8080"),
            history_bars: env("HISTORY_BARS", "250").parse().unwrap_or(250),
            bar: env("BAR_MINUTES", "1")
                .parse()
                .ok()
                .and_then(Timeframe::from_minutes)
                .unwrap_or(Timeframe::M1),
            fetch_retries: env("FETCH_RETRIES", "1").parse().unwrap_or(1),
            scoring_mode: env("SCORING_MODE", "precise")
                .parse()
                .unwrap_or(ScoringMode::Precise),
            cycle_interval_secs: env("CYCLE_INTERVAL_SECS", "120")
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(120),
            fetch_timeout_secs: env("FETCH_TIMEOUT_SECS", "8")
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(8),
            max_concurrency: env("MAX_CONCURRENCY", "8")
                .parse::<usize>()
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(8),
            state_dir: env("STATE_DIR", "state"),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.symbols.len(), DEFAULT_SYMBOLS.len());
        assert_eq!(cfg.history_bars, 250);
        assert_eq!(cfg.scoring_mode, ScoringMode::Precise);
        assert_eq!(cfg.cycle_interval(), Duration::from_secs(120));
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(8));
        assert_eq!(cfg.max_concurrency, 8);
        assert_eq!(cfg.bar, Timeframe::M1);
        assert_eq!(cfg.state_dir, "state");
    }

    #[test]
    fn overrides_and_fallbacks() {
        let cfg = Config::from_lookup(lookup(&[
            ("SYMBOLS", " frxEURUSD, OTC_GBPUSD ,,"),
            ("SCORING_MODE", "simplified"),
            ("HISTORY_BARS", "lots"),
            ("MAX_CONCURRENCY", "0"),
            ("BAR_MINUTES", "5"),
        ]));
        assert_eq!(cfg.symbols, vec!["frxEURUSD", "OTC_GBPUSD"]);
        assert_eq!(cfg.scoring_mode, ScoringMode::Simplified);
        assert_eq!(cfg.history_bars, 250);
        assert_eq!(cfg.max_concurrency, 8);
        assert_eq!(cfg.bar, Timeframe::M5);
    }
}
