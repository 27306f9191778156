use chrono::Utc;

/// Current wall-clock time as epoch milliseconds.
///
/// All persisted timestamps (`updated_at_ms`, `last_change_at_ms`,
/// `data_timestamp_ms`) use this representation.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
