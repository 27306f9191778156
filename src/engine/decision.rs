//! Per-instrument update decision.
//!
//! State per instrument is whatever `market_latest` holds (or its absence);
//! the decision itself is a pure function over that prior state, the
//! incoming quote, and the clock, so every rule is testable without
//! storage.

use crate::config::EngineTuning;
use crate::feed::parser::Quote;
use crate::store::model::LatestState;

/// Outcome of classifying one incoming quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No prior state. Always persist and seed history.
    FirstSeen,
    /// Fingerprint moved. Latest state is always overwritten; history is
    /// recorded only for significant moves outside the dense window.
    Changed { record_history: bool },
    /// Unchanged, but the last accepted write is old enough that readers
    /// need proof of liveness. Advances `updated_at` only.
    Heartbeat,
    /// Unchanged and written recently. Skip.
    Fresh,
    /// Unchanged, past the minimum spacing but not yet due a heartbeat.
    /// Skip.
    Idle,
    /// Flat for longer than the closed ceiling. Stop writing until the
    /// instrument moves again.
    Closed,
}

impl Decision {
    pub fn should_update(self) -> bool {
        matches!(
            self,
            Decision::FirstSeen | Decision::Changed { .. } | Decision::Heartbeat
        )
    }

    pub fn data_changed(self) -> bool {
        matches!(self, Decision::FirstSeen | Decision::Changed { .. })
    }

    pub fn record_history(self) -> bool {
        match self {
            Decision::FirstSeen => true,
            Decision::Changed { record_history } => record_history,
            _ => false,
        }
    }
}

/// Classifies one quote against its stored prior state.
pub fn decide(
    prior: Option<&LatestState>,
    quote: &Quote,
    fingerprint: &str,
    now_ms: i64,
    tuning: &EngineTuning,
) -> Decision {
    let Some(prev) = prior else {
        return Decision::FirstSeen;
    };

    let since_update = now_ms.saturating_sub(prev.updated_at_ms);
    let since_change = now_ms.saturating_sub(prev.last_change_at_ms);

    if fingerprint != prev.fingerprint {
        let significant =
            is_significant(prev.price, quote.price, prev.percent, quote.percent, tuning);

        // Shortly after a real change, while writes are still frequent,
        // suppress history to cap the write rate during fast opens.
        let dense_window = since_change < tuning.dense_change_window_ms
            && since_update < tuning.dense_update_floor_ms;

        return Decision::Changed {
            record_history: significant && !dense_window,
        };
    }

    if since_update < tuning.min_update_spacing_ms {
        return Decision::Fresh;
    }

    if since_change > tuning.closed_after_ms {
        return Decision::Closed;
    }

    if since_update >= tuning.heartbeat_interval_ms {
        return Decision::Heartbeat;
    }

    Decision::Idle
}

/// A changed quote below both thresholds is noise: latest state still
/// updates, history does not.
pub fn is_significant(
    old_price: f64,
    new_price: f64,
    old_percent: f64,
    new_percent: f64,
    tuning: &EngineTuning,
) -> bool {
    if old_price == 0.0 {
        return true;
    }

    let price_move_pct = ((new_price - old_price) / old_price * 100.0).abs();
    let percent_move = (new_percent - old_percent).abs();

    price_move_pct > tuning.min_price_move_pct || percent_move > tuning.min_percent_move
}
