//! Stale-read refresh worker.
//!
//! The read path never blocks on a refresh: it hands the stale codes to
//! this worker over a bounded channel and returns whatever is stored. The
//! worker runs the normal collect pipeline scoped to those codes and owns
//! its own error handling; a failed refresh only logs.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::engine::collector::Collector;

#[derive(Debug)]
pub struct RefreshRequest {
    pub codes: Vec<String>,
}

/// Spawns the refresh worker and returns its sender.
pub fn start_refresh_worker(
    collector: Arc<Collector>,
    capacity: usize,
) -> mpsc::Sender<RefreshRequest> {
    let (tx, mut rx) = mpsc::channel::<RefreshRequest>(capacity);

    tokio::spawn(async move {
        while let Some(req) = rx.recv().await {
            match collector.run_refresh(&req.codes).await {
                Ok(stats) => info!(
                    codes = req.codes.len(),
                    updated = stats.updated,
                    "stale-read refresh complete"
                ),
                Err(e) => warn!(
                    codes = req.codes.len(),
                    error = %e,
                    "stale-read refresh failed"
                ),
            }
        }
    });

    tx
}
