#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Base URL of the upstream quote feed (the `/list=` endpoint root).
    pub feed_url: String,

    /// Fixed cadence of the scheduled collection cycle, in seconds.
    ///
    /// Independent of read traffic; a failed cycle never delays the next one.
    pub collect_interval_secs: u64,

    /// Capacity of the channel feeding the stale-read refresh worker.
    ///
    /// Acts as backpressure: when the worker is busy, further refresh
    /// requests are dropped rather than queued without bound.
    pub refresh_queue_capacity: usize,

    /// Decision-engine thresholds.
    pub tuning: EngineTuning,
}

/// Thresholds driving the per-instrument update decision and the read-path
/// staleness check.
///
/// The defaults were inherited from the system being replaced; none of them
/// has a documented derivation. Treat them as operator-tunable values, not
/// constants.
#[derive(Clone, Debug)]
pub struct EngineTuning {
    /// Minimum spacing between writes for an unchanged instrument.
    ///
    /// An unchanged quote arriving sooner than this after the previous
    /// accepted write is skipped outright.
    pub min_update_spacing_ms: i64,

    /// An unchanged instrument whose last accepted write is older than this
    /// gets a heartbeat write: `updated_at` advances, `last_change_at` and
    /// history do not.
    pub heartbeat_interval_ms: i64,

    /// Once an instrument has been flat for longer than this, stop writing
    /// entirely until it moves again. Prevents perpetual heartbeats after
    /// the market closes.
    pub closed_after_ms: i64,

    /// Dense-sampling window: while the last real change is younger than
    /// this ceiling...
    pub dense_change_window_ms: i64,

    /// ...and the last write is younger than this floor, history recording
    /// is suppressed even for significant changes. Caps the history write
    /// rate during fast-moving opens.
    pub dense_update_floor_ms: i64,

    /// Relative price move (percent of the prior price) below which a
    /// changed quote is treated as noise for history purposes.
    pub min_price_move_pct: f64,

    /// Absolute change in the quoted percent field below which a changed
    /// quote is treated as noise for history purposes.
    pub min_percent_move: f64,

    /// Read-path freshness threshold: stored state older than this counts
    /// as stale and may trigger a background refresh.
    pub freshness_ms: i64,

    /// History rows older than this many days are pruned.
    pub retention_days: i64,

    /// Prune runs once every this many scheduled cycles.
    pub prune_every_cycles: u64,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            min_update_spacing_ms: 5 * 60 * 1000,
            heartbeat_interval_ms: 30 * 60 * 1000,
            closed_after_ms: 60 * 60 * 1000,
            dense_change_window_ms: 2 * 60 * 60 * 1000,
            dense_update_floor_ms: 5 * 60 * 1000,
            min_price_move_pct: 0.01,
            min_percent_move: 0.01,
            freshness_ms: 10 * 60 * 1000,
            retention_days: 30,
            prune_every_cycles: 32,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quotehub_dev.db".to_string());

        let feed_url = std::env::var("QUOTE_FEED_URL")
            .unwrap_or_else(|_| "https://hq.sinajs.cn".to_string());

        let collect_interval_secs = std::env::var("COLLECT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            database_url,
            feed_url,
            collect_interval_secs,
            refresh_queue_capacity: 16,
            tuning: EngineTuning::default(),
        }
    }
}
