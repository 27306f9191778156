use anyhow::Result;
use async_trait::async_trait;

use crate::instruments::FormatGroup;
use crate::store::model::{HistoryRow, LatestState};

/// Persistence seam for the engine's two stores.
///
/// The engine exclusively owns both tables: latest state is upserted in
/// place per instrument (last-writer-wins), history rows are append-only
/// and never mutated after insert.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn fetch_latest(&self, code: &str) -> Result<Option<LatestState>>;

    async fn fetch_latest_many(&self, codes: &[String]) -> Result<Vec<LatestState>>;

    async fn upsert_latest(&self, state: &LatestState) -> Result<()>;

    async fn insert_history(&self, row: &HistoryRow) -> Result<()>;

    /// History rows for one group with `data_timestamp_ms >= since_ms`,
    /// newest first, at most `limit` rows.
    async fn fetch_history(
        &self,
        group: FormatGroup,
        since_ms: i64,
        limit: u32,
    ) -> Result<Vec<HistoryRow>>;

    /// Deletes history rows older than `cutoff_ms`; returns rows removed.
    async fn prune_history(&self, cutoff_ms: i64) -> Result<u64>;
}
