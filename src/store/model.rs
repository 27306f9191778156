use crate::instruments::{Category, FormatGroup};

/// Current snapshot for one instrument. One row per code, overwritten in
/// place on every accepted write.
///
/// Invariants maintained by the collector's accept path:
/// - `last_change_at_ms <= updated_at_ms`
/// - `last_change_at_ms` advances only when `fingerprint` changes
/// - `updated_at_ms` advances on every accepted write, heartbeats included
#[derive(Debug, Clone, PartialEq)]
pub struct LatestState {
    pub code: String,
    pub category: Category,
    pub format_group: FormatGroup,
    pub raw: String,
    pub price: f64,
    pub change: f64,
    pub percent: f64,
    pub fingerprint: String,
    pub data_timestamp_ms: i64,
    pub updated_at_ms: i64,
    pub last_change_at_ms: i64,
}

/// One aggregated history row: all instruments of a format group that
/// recorded history in the same tick, as co-indexed CSV columns.
///
/// Position i in `codes` corresponds to position i in each value column.
/// Values are serialized at fixed 4-decimal precision. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub format_group: FormatGroup,
    pub codes: String,
    pub prices: String,
    pub changes: String,
    pub percents: String,
    pub data_timestamp_ms: i64,
}
