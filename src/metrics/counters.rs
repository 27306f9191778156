use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub cycles: Arc<AtomicU64>,

    pub quotes_updated: Arc<AtomicU64>,
    pub quotes_skipped: Arc<AtomicU64>,
    pub quotes_invalid: Arc<AtomicU64>,
    pub store_errors: Arc<AtomicU64>,

    pub history_rows: Arc<AtomicU64>,
    pub history_points: Arc<AtomicU64>,

    pub refresh_triggered: Arc<AtomicU64>,
    pub refresh_suppressed: Arc<AtomicU64>,
}
