//! History batching, reconstruction and downsampling.
//!
//! Writes: within one tick, every quote that earned a history record is
//! grouped by format group, and each non-empty group becomes exactly one
//! columnar row. N instruments sharing a group and a tick cost one row,
//! not N.
//!
//! Reads: a per-instrument series is rebuilt by locating the code inside
//! each row's co-indexed columns, then downsampled for display.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::instruments::FormatGroup;
use crate::store::model::HistoryRow;

/// One reconstructed time-series point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub price: f64,
    pub change: f64,
    pub percent: f64,
    pub data_timestamp_ms: i64,
}

#[derive(Default)]
struct Columns {
    codes: Vec<String>,
    prices: Vec<String>,
    changes: Vec<String>,
    percents: Vec<String>,
}

/// Accumulates one tick's history writes, one column set per format group.
///
/// `finish` is called once, after the whole tick has been classified, so
/// the number of history inserts per tick is bounded by the number of
/// distinct format groups.
#[derive(Default)]
pub struct HistoryBatcher {
    groups: HashMap<FormatGroup, Columns>,
}

impl HistoryBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: FormatGroup, code: &str, price: f64, change: f64, percent: f64) {
        let cols = self.groups.entry(group).or_default();
        cols.codes.push(code.to_string());
        cols.prices.push(format!("{price:.4}"));
        cols.changes.push(format!("{change:.4}"));
        cols.percents.push(format!("{percent:.4}"));
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// One row per non-empty group, all stamped with the tick's timestamp.
    pub fn finish(self, data_timestamp_ms: i64) -> Vec<HistoryRow> {
        self.groups
            .into_iter()
            .map(|(group, cols)| HistoryRow {
                format_group: group,
                codes: cols.codes.join(","),
                prices: cols.prices.join(","),
                changes: cols.changes.join(","),
                percents: cols.percents.join(","),
                data_timestamp_ms,
            })
            .collect()
    }
}

/// Expands aggregated rows (newest first, as fetched) into an ascending
/// series for one code. Rows where the code has no entry contribute
/// nothing.
pub fn extract_series(rows: &[HistoryRow], code: &str) -> Vec<HistoryPoint> {
    let mut points = Vec::new();

    for row in rows {
        let Some(idx) = row.codes.split(',').position(|c| c == code) else {
            continue;
        };

        points.push(HistoryPoint {
            price: column_value(&row.prices, idx),
            change: column_value(&row.changes, idx),
            percent: column_value(&row.percents, idx),
            data_timestamp_ms: row.data_timestamp_ms,
        });
    }

    points.reverse();
    points
}

fn column_value(column: &str, idx: usize) -> f64 {
    column
        .split(',')
        .nth(idx)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Display cap for a lookback window. Short windows keep roughly 5-minute
/// resolution; long windows thin out further.
pub fn cap_for_window(days: u32) -> usize {
    if days <= 1 {
        288
    } else if days <= 5 {
        180
    } else {
        120
    }
}

/// Thins a series to at most `cap` points: evenly strided indices, with
/// the final (most recent) point always kept even when the stride would
/// miss it.
pub fn downsample(points: Vec<HistoryPoint>, cap: usize) -> Vec<HistoryPoint> {
    if cap == 0 || points.is_empty() || points.len() <= cap {
        return points;
    }

    let len = points.len();
    let step = len as f64 / cap as f64;

    let mut out: Vec<HistoryPoint> = (0..cap)
        .map(|i| points[(i as f64 * step) as usize].clone())
        .collect();

    let last = points[len - 1].clone();
    if out.last() != Some(&last) {
        out[cap - 1] = last;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(ts: i64) -> HistoryPoint {
        HistoryPoint {
            price: ts as f64,
            change: 0.0,
            percent: 0.0,
            data_timestamp_ms: ts,
        }
    }

    #[test]
    fn batcher_emits_one_row_per_group() {
        let mut batcher = HistoryBatcher::new();
        batcher.push(FormatGroup::CnIndex, "s_sh000001", 3266.72, 71.84, 2.25);
        batcher.push(FormatGroup::CnIndex, "s_sz399001", 10_001.5, -3.2, -0.03);
        batcher.push(FormatGroup::Fx, "EURUSD", 1.0852, 0.001, 0.09);

        let mut rows = batcher.finish(1_000);
        rows.sort_by_key(|r| r.format_group.as_str());

        assert_eq!(rows.len(), 2);
        let cn = rows.iter().find(|r| r.format_group == FormatGroup::CnIndex).unwrap();
        assert_eq!(cn.codes, "s_sh000001,s_sz399001");
        assert_eq!(cn.prices, "3266.7200,10001.5000");
        assert_eq!(cn.changes, "71.8400,-3.2000");
        assert_eq!(cn.percents, "2.2500,-0.0300");
        assert_eq!(cn.data_timestamp_ms, 1_000);
    }

    #[test]
    fn round_trip_is_lossless_per_code() {
        // Several instruments share a group and a tick; reconstructing any
        // one of them yields exactly one point with the pushed values.
        let mut batcher = HistoryBatcher::new();
        batcher.push(FormatGroup::Futures, "hf_XAU", 2500.1234, 12.5678, 0.5043);
        batcher.push(FormatGroup::Futures, "hf_XAG", 29.4321, -0.1234, -0.4171);
        batcher.push(FormatGroup::Futures, "hf_CL", 78.9, 1.1, 1.41);

        let rows = batcher.finish(42_000);
        assert_eq!(rows.len(), 1);

        for (code, price, change, percent) in [
            ("hf_XAU", 2500.1234, 12.5678, 0.5043),
            ("hf_XAG", 29.4321, -0.1234, -0.4171),
            ("hf_CL", 78.9, 1.1, 1.41),
        ] {
            let series = extract_series(&rows, code);
            assert_eq!(series.len(), 1, "{code}");
            assert_eq!(series[0].price, price);
            assert_eq!(series[0].change, change);
            assert_eq!(series[0].percent, percent);
            assert_eq!(series[0].data_timestamp_ms, 42_000);
        }
    }

    #[test]
    fn absent_code_contributes_nothing() {
        let mut batcher = HistoryBatcher::new();
        batcher.push(FormatGroup::Futures, "hf_XAU", 2500.0, 1.0, 0.04);
        let rows = batcher.finish(1);

        assert!(extract_series(&rows, "hf_CL").is_empty());
        // A code that is a prefix of a present one must not match either.
        assert!(extract_series(&rows, "hf_XA").is_empty());
    }

    #[test]
    fn series_is_ascending_in_time() {
        // Rows arrive newest first, as the store returns them.
        let rows: Vec<HistoryRow> = [3_000i64, 2_000, 1_000]
            .iter()
            .map(|&ts| {
                let mut b = HistoryBatcher::new();
                b.push(FormatGroup::Fx, "EURUSD", ts as f64, 0.0, 0.0);
                b.finish(ts).pop().unwrap()
            })
            .collect();

        let series = extract_series(&rows, "EURUSD");
        let stamps: Vec<i64> = series.iter().map(|p| p.data_timestamp_ms).collect();
        assert_eq!(stamps, vec![1_000, 2_000, 3_000]);
    }

    #[test]
    fn downsample_is_identity_under_cap() {
        let points: Vec<_> = (0..50).map(|i| point(i)).collect();
        assert_eq!(downsample(points.clone(), 100), points);
    }

    #[test]
    fn downsample_respects_cap_and_keeps_last() {
        let points: Vec<_> = (0..1000).map(|i| point(i)).collect();
        let out = downsample(points, 120);

        assert_eq!(out.len(), 120);
        assert_eq!(out.first().unwrap().data_timestamp_ms, 0);
        assert_eq!(out.last().unwrap().data_timestamp_ms, 999);
    }

    #[test]
    fn window_caps_are_tiered() {
        assert_eq!(cap_for_window(1), 288);
        assert_eq!(cap_for_window(5), 180);
        assert_eq!(cap_for_window(30), 120);
        assert!(cap_for_window(1) > cap_for_window(30));
    }

    proptest! {
        #[test]
        fn downsample_never_exceeds_cap_and_always_keeps_last(
            len in 1usize..2_000,
            cap in 1usize..400,
        ) {
            let points: Vec<_> = (0..len as i64).map(point).collect();
            let last = points.last().cloned().unwrap();

            let out = downsample(points, cap);

            prop_assert!(out.len() <= cap);
            prop_assert!(!out.is_empty());
            prop_assert_eq!(out.last().cloned().unwrap(), last);
        }

        #[test]
        fn downsample_preserves_chronological_order(
            len in 2usize..2_000,
            cap in 2usize..400,
        ) {
            let points: Vec<_> = (0..len as i64).map(point).collect();
            let out = downsample(points, cap);

            for pair in out.windows(2) {
                prop_assert!(pair[0].data_timestamp_ms <= pair[1].data_timestamp_ms);
            }
        }
    }
}
