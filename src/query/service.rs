//! Read path.
//!
//! Latest-quote reads render stored payloads back in the upstream wire
//! format (consumers expect payload parity with the feed) and may schedule
//! a background refresh for a stale minority of the requested codes.
//! History reads reconstruct one instrument's series from the aggregated
//! rows and downsample it for display.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::EngineTuning;
use crate::engine::history::{HistoryPoint, cap_for_window, downsample, extract_series};
use crate::engine::refresh::RefreshRequest;
use crate::error::AppError;
use crate::instruments::{FormatGroup, InstrumentSet};
use crate::metrics::counters::Counters;
use crate::store::repository::QuoteRepository;
use crate::time::now_ms;

/// JSON envelope for the history endpoint.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub code: String,
    pub days: u32,
    pub count: usize,
    pub data: Vec<HistoryPoint>,
}

pub struct ReadService {
    repo: Arc<dyn QuoteRepository>,
    instruments: Arc<InstrumentSet>,
    tuning: EngineTuning,
    counters: Counters,
    refresh_tx: mpsc::Sender<RefreshRequest>,
}

impl ReadService {
    pub fn new(
        repo: Arc<dyn QuoteRepository>,
        instruments: Arc<InstrumentSet>,
        tuning: EngineTuning,
        counters: Counters,
        refresh_tx: mpsc::Sender<RefreshRequest>,
    ) -> Self {
        Self {
            repo,
            instruments,
            tuning,
            counters,
            refresh_tx,
        }
    }

    /// Current snapshots for `codes`, rendered one wire line per found
    /// code. Missing codes are simply absent. A store fault degrades to an
    /// empty response rather than an error: the read path never fails
    /// outright for storage reasons.
    pub async fn latest_quotes(&self, codes: &[String]) -> String {
        let now = now_ms();

        let rows = match self.repo.fetch_latest_many(codes).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "latest-state read failed, returning no data");
                return String::new();
            }
        };

        let mut out = String::new();
        let mut stale = Vec::new();

        for row in &rows {
            let _ = writeln!(out, "var hq_str_{}=\"{}\";", row.code, row.raw);

            if now - row.updated_at_ms > self.tuning.freshness_ms {
                stale.push(row.code.clone());
            }
        }

        self.maybe_refresh(stale, codes.len());

        out
    }

    /// Schedules a background refresh iff a strict minority of the
    /// requested codes is stale. At 50% or more, the repair is left to the
    /// scheduled cycle: many readers asking for predominantly cold codes
    /// must not dogpile the upstream feed.
    fn maybe_refresh(&self, stale: Vec<String>, requested: usize) {
        if stale.is_empty() {
            return;
        }

        if stale.len() * 2 >= requested {
            debug!(
                stale = stale.len(),
                requested, "majority stale, leaving refresh to the scheduled cycle"
            );
            self.counters.refresh_suppressed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        // Fire-and-forget; a full queue just drops the request.
        match self.refresh_tx.try_send(RefreshRequest { codes: stale }) {
            Ok(()) => {
                self.counters.refresh_triggered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                debug!(error = %e, "refresh queue unavailable, dropping request");
            }
        }
    }

    /// Reconstructed, downsampled series for one code, oldest to newest.
    ///
    /// Unlike the latest-quote read there is no sensible partial fallback
    /// for a single-code series, so store faults surface as errors.
    pub async fn history(
        &self,
        code: &str,
        days: u32,
        limit: u32,
    ) -> Result<Vec<HistoryPoint>, AppError> {
        if !self.instruments.contains(code) {
            return Err(AppError::UnknownCode(code.to_string()));
        }

        let group = FormatGroup::from_code(code);
        let since_ms = now_ms() - days as i64 * 86_400_000;

        let rows = self
            .repo
            .fetch_history(group, since_ms, limit)
            .await
            .map_err(AppError::HistoryQuery)?;

        let series = extract_series(&rows, code);
        Ok(downsample(series, cap_for_window(days)))
    }

    /// Same series, wrapped in the JSON envelope the transport layer
    /// returns verbatim.
    pub async fn history_json(
        &self,
        code: &str,
        days: u32,
        limit: u32,
    ) -> Result<String, AppError> {
        let data = self.history(code, days, limit).await?;

        let body = HistoryResponse {
            code: code.to_string(),
            days,
            count: data.len(),
            data,
        };

        Ok(serde_json::to_string(&body)?)
    }
}
