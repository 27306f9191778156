//! Ingestion cycle.
//!
//! One cycle: fetch the feed for a set of codes, parse, then classify each
//! quote against its stored state. Accepted quotes overwrite latest state
//! per instrument; quotes that earned a history record are grouped by
//! format group and flushed as one row per group after the whole tick has
//! been classified.
//!
//! Fault containment: a transport failure aborts the cycle (the next
//! scheduled tick retries independently); a per-instrument storage failure
//! is counted and the rest of the batch continues; a prior-state lookup
//! failure fails open into a forced update so a real change is never
//! silently dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use tracing::{Instrument, debug, info, warn};

use crate::config::EngineTuning;
use crate::engine::decision::{Decision, decide};
use crate::engine::fingerprint::fingerprint;
use crate::engine::history::HistoryBatcher;
use crate::feed::client::FeedClient;
use crate::feed::parser::{Quote, parse_feed};
use crate::instruments::InstrumentSet;
use crate::logger::{self, TraceId, warn_if_slow};
use crate::metrics::counters::Counters;
use crate::store::model::LatestState;
use crate::store::repository::QuoteRepository;
use crate::time::now_ms;

/// Per-cycle outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub parsed: u64,
    pub updated: u64,
    pub skipped: u64,
    pub invalid: u64,
    pub errors: u64,
    pub history_rows: u64,
    pub history_points: u64,
}

pub struct Collector {
    repo: Arc<dyn QuoteRepository>,
    client: FeedClient,
    instruments: Arc<InstrumentSet>,
    tuning: EngineTuning,
    counters: Counters,
    cycle_seq: AtomicU64,
}

impl Collector {
    pub fn new(
        repo: Arc<dyn QuoteRepository>,
        client: FeedClient,
        instruments: Arc<InstrumentSet>,
        tuning: EngineTuning,
        counters: Counters,
    ) -> Self {
        Self {
            repo,
            client,
            instruments,
            tuning,
            counters,
            cycle_seq: AtomicU64::new(0),
        }
    }

    /// One scheduled cycle over the full instrument universe. Also drives
    /// retention pruning on its fixed cadence.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleStats> {
        let trace_id = TraceId::random();
        let span = logger::cycle_span("collect", &trace_id);

        async {
            logger::annotate_cycle("scheduled");

            let codes: Vec<&str> = self.instruments.codes().collect();
            let stats = self.collect(&codes).await?;

            let seq = self.cycle_seq.fetch_add(1, Ordering::Relaxed) + 1;
            self.counters.cycles.fetch_add(1, Ordering::Relaxed);
            if seq % self.tuning.prune_every_cycles == 0 {
                self.prune_history().await;
            }

            Ok(stats)
        }
        .instrument(span)
        .await
    }

    /// A refresh cycle scoped to specific stale codes. Same pipeline as the
    /// scheduled cycle, no pruning.
    pub async fn run_refresh(&self, codes: &[String]) -> anyhow::Result<CycleStats> {
        let trace_id = TraceId::random();
        let span = logger::cycle_span("collect", &trace_id);

        async {
            logger::annotate_cycle("refresh");

            let refs: Vec<&str> = codes
                .iter()
                .map(|c| c.as_str())
                .filter(|c| self.instruments.contains(c))
                .collect();
            self.collect(&refs).await
        }
        .instrument(span)
        .await
    }

    async fn collect(&self, codes: &[&str]) -> anyhow::Result<CycleStats> {
        if codes.is_empty() {
            return Ok(CycleStats::default());
        }

        let text = warn_if_slow(
            "feed_fetch",
            Duration::from_secs(5),
            self.client.fetch_quotes(codes),
        )
        .await
        .context("feed fetch failed")?;

        let quotes = parse_feed(&text, &self.instruments);
        let stats = self.ingest(quotes, now_ms()).await;

        info!(
            parsed = stats.parsed,
            updated = stats.updated,
            skipped = stats.skipped,
            invalid = stats.invalid,
            errors = stats.errors,
            history_rows = stats.history_rows,
            history_points = stats.history_points,
            "collection cycle complete"
        );

        Ok(stats)
    }

    /// Classifies and persists one tick's parsed quotes.
    ///
    /// Grouped history rows are flushed only after every quote has been
    /// classified, so each (group, tick) write is all-or-nothing at the row
    /// level.
    pub async fn ingest(&self, quotes: Vec<Quote>, now_ms: i64) -> CycleStats {
        let mut stats = CycleStats {
            parsed: quotes.len() as u64,
            ..CycleStats::default()
        };
        let mut batcher = HistoryBatcher::new();

        for quote in &quotes {
            if !quote.plausible() {
                warn!(code = %quote.code, price = quote.price, "implausible quote rejected");
                stats.invalid += 1;
                continue;
            }

            let fp = fingerprint(quote.price, quote.change, quote.percent);

            let (prior, decision) = match self.repo.fetch_latest(&quote.code).await {
                Ok(prior) => {
                    let d = decide(prior.as_ref(), quote, &fp, now_ms, &self.tuning);
                    (prior, d)
                }
                Err(e) => {
                    // Fail open: a lost lookup must not drop a real change.
                    warn!(code = %quote.code, error = %e, "prior-state lookup failed, forcing update");
                    (None, Decision::FirstSeen)
                }
            };

            if !decision.should_update() {
                debug!(code = %quote.code, ?decision, "no update needed");
                stats.skipped += 1;
                continue;
            }

            let last_change_at_ms = if decision.data_changed() {
                now_ms
            } else {
                prior.map(|p| p.last_change_at_ms).unwrap_or(now_ms)
            };

            let state = LatestState {
                code: quote.code.clone(),
                category: quote.category,
                format_group: quote.format_group,
                raw: quote.raw.clone(),
                price: quote.price,
                change: quote.change,
                percent: quote.percent,
                fingerprint: fp,
                data_timestamp_ms: now_ms,
                updated_at_ms: now_ms,
                last_change_at_ms,
            };

            if let Err(e) = self.repo.upsert_latest(&state).await {
                warn!(code = %quote.code, error = %e, "latest-state write failed");
                stats.errors += 1;
                continue;
            }
            stats.updated += 1;

            if decision.record_history() {
                batcher.push(
                    quote.format_group,
                    &quote.code,
                    quote.price,
                    quote.change,
                    quote.percent,
                );
            }
        }

        for row in batcher.finish(now_ms) {
            let points = row.codes.split(',').count() as u64;
            match self.repo.insert_history(&row).await {
                Ok(()) => {
                    debug!(group = row.format_group.as_str(), points, "history row written");
                    stats.history_rows += 1;
                    stats.history_points += points;
                }
                Err(e) => {
                    warn!(group = row.format_group.as_str(), error = %e, "history write failed");
                    stats.errors += 1;
                }
            }
        }

        self.account(&stats);
        stats
    }

    async fn prune_history(&self) {
        let cutoff_ms = now_ms() - self.tuning.retention_days * 86_400_000;

        match self.repo.prune_history(cutoff_ms).await {
            Ok(deleted) => info!(deleted, cutoff_ms, "pruned old history rows"),
            Err(e) => warn!(error = %e, "history prune failed"),
        }
    }

    fn account(&self, stats: &CycleStats) {
        let c = &self.counters;
        c.quotes_updated.fetch_add(stats.updated, Ordering::Relaxed);
        c.quotes_skipped.fetch_add(stats.skipped, Ordering::Relaxed);
        c.quotes_invalid.fetch_add(stats.invalid, Ordering::Relaxed);
        c.store_errors.fetch_add(stats.errors, Ordering::Relaxed);
        c.history_rows.fetch_add(stats.history_rows, Ordering::Relaxed);
        c.history_points
            .fetch_add(stats.history_points, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    use crate::instruments::{Category, FormatGroup};
    use crate::store::model::HistoryRow;

    /// In-memory repository; `fail_latest_reads` / `fail_writes_for` inject
    /// per-instrument storage faults.
    #[derive(Default)]
    struct MockRepo {
        latest: Mutex<HashMap<String, LatestState>>,
        history: Mutex<Vec<HistoryRow>>,
        fail_latest_reads: Mutex<bool>,
        fail_writes_for: Mutex<Option<String>>,
        pruned_before: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl QuoteRepository for MockRepo {
        async fn fetch_latest(&self, code: &str) -> anyhow::Result<Option<LatestState>> {
            if *self.fail_latest_reads.lock() {
                return Err(anyhow!("simulated read fault"));
            }
            Ok(self.latest.lock().get(code).cloned())
        }

        async fn fetch_latest_many(&self, codes: &[String]) -> anyhow::Result<Vec<LatestState>> {
            let map = self.latest.lock();
            Ok(codes.iter().filter_map(|c| map.get(c).cloned()).collect())
        }

        async fn upsert_latest(&self, state: &LatestState) -> anyhow::Result<()> {
            if self.fail_writes_for.lock().as_deref() == Some(state.code.as_str()) {
                return Err(anyhow!("simulated write fault"));
            }
            self.latest
                .lock()
                .insert(state.code.clone(), state.clone());
            Ok(())
        }

        async fn insert_history(&self, row: &HistoryRow) -> anyhow::Result<()> {
            self.history.lock().push(row.clone());
            Ok(())
        }

        async fn fetch_history(
            &self,
            group: FormatGroup,
            since_ms: i64,
            limit: u32,
        ) -> anyhow::Result<Vec<HistoryRow>> {
            let mut rows: Vec<_> = self
                .history
                .lock()
                .iter()
                .filter(|r| r.format_group == group && r.data_timestamp_ms >= since_ms)
                .cloned()
                .collect();
            rows.sort_by_key(|r| std::cmp::Reverse(r.data_timestamp_ms));
            rows.truncate(limit as usize);
            Ok(rows)
        }

        async fn prune_history(&self, cutoff_ms: i64) -> anyhow::Result<u64> {
            self.pruned_before.lock().push(cutoff_ms);
            Ok(0)
        }
    }

    fn collector(repo: Arc<MockRepo>) -> Collector {
        Collector::new(
            repo,
            FeedClient::new("http://feed.invalid".to_string()).unwrap(),
            Arc::new(InstrumentSet::builtin()),
            EngineTuning::default(),
            Counters::default(),
        )
    }

    fn quote(code: &str, category: Category, price: f64, change: f64, percent: f64) -> Quote {
        Quote {
            code: code.to_string(),
            category,
            format_group: FormatGroup::from_code(code),
            raw: format!("x,{price},{change},{percent}"),
            price,
            change,
            percent,
        }
    }

    const MIN: i64 = 60 * 1000;

    #[tokio::test]
    async fn first_seen_writes_state_and_history() {
        let repo = Arc::new(MockRepo::default());
        let c = collector(repo.clone());

        let stats = c
            .ingest(
                vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)],
                1_000 * MIN,
            )
            .await;

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.history_rows, 1);
        assert_eq!(stats.history_points, 1);

        let state = repo.latest.lock().get("s_sh000001").cloned().unwrap();
        assert_eq!(state.price, 100.0);
        assert_eq!(state.updated_at_ms, 1_000 * MIN);
        assert_eq!(state.last_change_at_ms, 1_000 * MIN);
        assert!(state.last_change_at_ms <= state.updated_at_ms);
    }

    #[tokio::test]
    async fn implausible_quotes_never_reach_the_engine() {
        let repo = Arc::new(MockRepo::default());
        let c = collector(repo.clone());

        let stats = c
            .ingest(
                vec![
                    quote("s_sh000001", Category::Cn, 0.0, 0.0, 0.0),
                    quote("s_sz399001", Category::Cn, 0.5, 0.0, 0.0),
                    quote("hf_CL", Category::Energy, -3.0, 0.0, 0.0),
                ],
                1_000 * MIN,
            )
            .await;

        assert_eq!(stats.invalid, 3);
        assert_eq!(stats.updated, 0);
        assert!(repo.latest.lock().is_empty());
        assert!(repo.history.lock().is_empty());
    }

    #[tokio::test]
    async fn same_tick_group_members_share_one_history_row() {
        let repo = Arc::new(MockRepo::default());
        let c = collector(repo.clone());

        let stats = c
            .ingest(
                vec![
                    quote("hf_XAU", Category::Metal, 2500.0, 10.0, 0.4),
                    quote("hf_XAG", Category::Metal, 29.5, -0.1, -0.34),
                    quote("hf_CL", Category::Energy, 78.9, 1.1, 1.41),
                    quote("EURUSD", Category::Fx, 1.0852, 0.001, 0.09),
                ],
                1_000 * MIN,
            )
            .await;

        // hf_* all share the futures group; EURUSD is fx.
        assert_eq!(stats.updated, 4);
        assert_eq!(stats.history_rows, 2);
        assert_eq!(stats.history_points, 4);

        let history = repo.history.lock();
        let futures = history
            .iter()
            .find(|r| r.format_group == FormatGroup::Futures)
            .unwrap();
        assert_eq!(futures.codes, "hf_XAU,hf_XAG,hf_CL");
    }

    #[tokio::test]
    async fn end_to_end_fresh_then_heartbeat() {
        let repo = Arc::new(MockRepo::default());
        let c = collector(repo.clone());
        let t0 = 10_000 * MIN;

        // Tick 1: first observation -> state + history.
        let stats = c
            .ingest(vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)], t0)
            .await;
        assert_eq!((stats.updated, stats.history_rows), (1, 1));

        // Tick 2, one second later, identical values -> fresh skip.
        let stats = c
            .ingest(
                vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)],
                t0 + 1_000,
            )
            .await;
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(repo.history.lock().len(), 1);

        // Tick 3, 31 minutes later, identical values -> heartbeat.
        let stats = c
            .ingest(
                vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)],
                t0 + 31 * MIN,
            )
            .await;
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.history_rows, 0);

        let state = repo.latest.lock().get("s_sh000001").cloned().unwrap();
        assert_eq!(state.updated_at_ms, t0 + 31 * MIN);
        assert_eq!(state.last_change_at_ms, t0);
        assert!(state.last_change_at_ms <= state.updated_at_ms);
        assert_eq!(repo.history.lock().len(), 1);
    }

    #[tokio::test]
    async fn lookup_fault_fails_open() {
        let repo = Arc::new(MockRepo::default());
        let c = collector(repo.clone());

        // Seed prior state, then break reads.
        c.ingest(
            vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)],
            1_000 * MIN,
        )
        .await;
        *repo.fail_latest_reads.lock() = true;

        // Identical values one second later would normally be skipped;
        // the lookup fault forces update + history instead.
        let stats = c
            .ingest(
                vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)],
                1_000 * MIN + 1_000,
            )
            .await;

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.history_rows, 1);
        assert_eq!(repo.history.lock().len(), 2);
    }

    #[tokio::test]
    async fn one_instruments_write_fault_does_not_abort_the_batch() {
        let repo = Arc::new(MockRepo::default());
        *repo.fail_writes_for.lock() = Some("hf_XAU".to_string());
        let c = collector(repo.clone());

        let stats = c
            .ingest(
                vec![
                    quote("hf_XAU", Category::Metal, 2500.0, 10.0, 0.4),
                    quote("hf_XAG", Category::Metal, 29.5, -0.1, -0.34),
                ],
                1_000 * MIN,
            )
            .await;

        assert_eq!(stats.errors, 1);
        assert_eq!(stats.updated, 1);

        // The failed instrument never reaches the history batch.
        let history = repo.history.lock();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].codes, "hf_XAG");
    }

    #[tokio::test]
    async fn sub_threshold_move_updates_state_without_history() {
        let repo = Arc::new(MockRepo::default());
        let c = collector(repo.clone());
        let t0 = 10_000 * MIN;

        c.ingest(vec![quote("s_sh000001", Category::Cn, 100.0, 1.0, 1.0)], t0)
            .await;

        // 0.005% move: fingerprint changes, significance does not.
        let stats = c
            .ingest(
                vec![quote("s_sh000001", Category::Cn, 100.005, 1.0, 1.005)],
                t0 + 10 * MIN,
            )
            .await;

        assert_eq!(stats.updated, 1);
        assert_eq!(stats.history_rows, 0);

        let state = repo.latest.lock().get("s_sh000001").cloned().unwrap();
        assert_eq!(state.price, 100.005);
        assert_eq!(state.last_change_at_ms, t0 + 10 * MIN);
    }
}
