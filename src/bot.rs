use anyhow::anyhow;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::feed::PriceFeed;
use crate::models::TradeOutcome;
use crate::notify::{Notifier, Recommendation};
use crate::strategies::scorer::SignalScorer;
use crate::strategies::signals::SignalCandidate;
use crate::trading::risk_manager::SharedRiskManager;

/// What happened to one symbol during a cycle.
#[derive(Debug)]
enum SymbolOutcome {
    Candidate(SignalCandidate),
    NoSignal,
    Insufficient(usize),
    Failed(anyhow::Error),
    TimedOut,
}

/// Per-cycle tallies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub symbols: usize,
    pub evaluated: usize,
    pub insufficient: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub candidates: usize,
    pub rejected: usize,
    pub dispatched: Option<Recommendation>,
}

pub struct SignalBot {
    config: Config,
    feed: Arc<dyn PriceFeed>,
    scorer: Arc<SignalScorer>,
    risk: SharedRiskManager,
    notifier: Arc<dyn Notifier>,
}

impl SignalBot {
    pub fn new(
        config: Config,
        feed: Arc<dyn PriceFeed>,
        scorer: SignalScorer,
        risk: SharedRiskManager,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        info!("{}", "=".repeat(60));
        info!("FX signal bot starting up");
        info!(
            "Symbols: {} | scoring: {:?} (min confidence {:.0}) | history: {} bars",
            config.symbols.len(),
            scorer.mode(),
            scorer.params().min_confidence,
            config.history_bars
        );
        info!(
            "Cycle every {}s | fetch timeout {}s | concurrency {}",
            config.cycle_interval_secs, config.fetch_timeout_secs, config.max_concurrency
        );
        info!("{}", "=".repeat(60));

        Self {
            config,
            feed,
            scorer: Arc::new(scorer),
            risk,
            notifier,
        }
    }

    pub fn risk(&self) -> SharedRiskManager {
        self.risk.clone()
    }

    /// Runs one cycle per tick until `shutdown` resolves. A cycle still in
    /// flight at shutdown is dropped, which aborts its symbol tasks.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.config.cycle_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Bot is now running. Press Ctrl+C to stop.");
        self.print_status().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Shutdown requested mid-cycle, abandoning it");
                    break;
                }
                _ = self.run_cycle() => {}
            }
        }

        self.shutdown().await;
    }

    /// Fetches and scores every configured symbol, then passes the
    /// strongest candidates through the risk gate and dispatches the first
    /// one it allows.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            symbols: self.config.symbols.len(),
            ..CycleReport::default()
        };

        let mut candidates = self.scan_symbols(&mut report).await;
        report.candidates = candidates.len();

        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        let selected = {
            let mut risk = self.risk.lock().await;
            let mut selected = None;
            for candidate in candidates {
                let decision = risk.evaluate(&candidate);
                if decision.allowed {
                    for warning in &decision.warnings {
                        debug!("{}: {}", candidate.symbol, warning);
                    }
                    let rec = Recommendation::new(
                        &candidate,
                        &decision,
                        &risk.settings().currency,
                        risk.now(),
                    );
                    selected = Some(rec);
                    break;
                }
                report.rejected += 1;
                info!(
                    "{} {} rejected: {}",
                    candidate.symbol,
                    candidate.direction,
                    decision.reason.as_deref().unwrap_or("no reason given")
                );
            }
            selected
        };

        if let Some(rec) = selected {
            match self.notifier.notify(&rec).await {
                Ok(()) => info!(
                    "Dispatched {} {} ({:.0}% confidence, stake {:.2})",
                    rec.display_symbol, rec.direction, rec.confidence, rec.recommended_amount
                ),
                Err(e) => error!("Failed to dispatch {}: {:#}", rec.display_symbol, e),
            }
            report.dispatched = Some(rec);
        }

        info!(
            "Cycle done in {:.1}s: {}/{} evaluated, {} candidates, {} rejected, {} failed, {} timed out, {} short",
            started.elapsed().as_secs_f64(),
            report.evaluated,
            report.symbols,
            report.candidates,
            report.rejected,
            report.failed,
            report.timed_out,
            report.insufficient
        );
        report
    }

    async fn scan_symbols(&self, report: &mut CycleReport) -> Vec<SignalCandidate> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for symbol in &self.config.symbols {
            let symbol = symbol.clone();
            let permits = permits.clone();
            let feed = self.feed.clone();
            let scorer = self.scorer.clone();
            let bars = self.config.history_bars;
            let limit = self.config.fetch_timeout();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (symbol, SymbolOutcome::Failed(anyhow!("worker pool closed")));
                };
                let outcome = match timeout(limit, feed.fetch_history(&symbol, bars)).await {
                    Err(_) => SymbolOutcome::TimedOut,
                    Ok(Err(e)) => SymbolOutcome::Failed(e),
                    Ok(Ok(series)) => match series.last_close() {
                        Some(price) if series.len() >= scorer.min_bars() => {
                            match scorer.evaluate_series(&series, price, &symbol) {
                                Some(candidate) => SymbolOutcome::Candidate(candidate),
                                None => SymbolOutcome::NoSignal,
                            }
                        }
                        _ => SymbolOutcome::Insufficient(series.len()),
                    },
                };
                (symbol, outcome)
            });
        }

        let mut candidates = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (symbol, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!("Symbol task panicked or was cancelled: {}", e);
                    report.failed += 1;
                    continue;
                }
            };
            match outcome {
                SymbolOutcome::Candidate(candidate) => {
                    report.evaluated += 1;
                    info!(
                        "{}: {} candidate, confidence {:.1}, {} reasons, {}",
                        symbol,
                        candidate.direction,
                        candidate.confidence,
                        candidate.reasons.len(),
                        candidate.quality
                    );
                    candidates.push(candidate);
                }
                SymbolOutcome::NoSignal => report.evaluated += 1,
                SymbolOutcome::Insufficient(len) => {
                    report.insufficient += 1;
                    debug!(
                        "{}: only {} bars, need {}",
                        symbol,
                        len,
                        self.scorer.min_bars()
                    );
                }
                SymbolOutcome::Failed(e) => {
                    report.failed += 1;
                    debug!("{}: fetch failed: {:#}", symbol, e);
                }
                SymbolOutcome::TimedOut => {
                    report.timed_out += 1;
                    warn!(
                        "{}: no history within {}s, skipped",
                        symbol, self.config.fetch_timeout_secs
                    );
                }
            }
        }
        candidates
    }

    /// Reports a settled trade to the risk manager.
    pub async fn record_result(&self, symbol: &str, outcome: TradeOutcome, amount: f64, profit: f64) {
        self.risk
            .lock()
            .await
            .record_result(symbol, outcome, amount, profit);
    }

    async fn print_status(&self) {
        let report = self.risk.lock().await.report();
        let d = &report.daily;
        info!("Account risk: {:?}", report.current_risk_level);
        info!(
            "Trades today: {} | Win rate: {:.1}% | Net: {:+.2} {}",
            d.trades_count, d.win_rate, d.net_profit, report.settings.currency
        );
        if !report.cooldowns.is_empty() {
            let names: Vec<&str> = report.cooldowns.iter().map(|(s, _)| s.as_str()).collect();
            info!("Cooling down: {}", names.join(", "));
        }
        if !report.blacklisted.is_empty() {
            info!("Blacklisted: {}", report.blacklisted.join(", "));
        }
        for rec in &report.recommendations {
            info!("Note: {}", rec);
        }
    }

    async fn shutdown(&self) {
        info!("Shutting down...");
        self.print_status().await;
        info!("Bot stopped.");
    }
}
