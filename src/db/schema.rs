use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Latest state: one row per instrument, overwritten in place.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS market_latest (
  code TEXT PRIMARY KEY,
  category TEXT NOT NULL,
  format_group TEXT NOT NULL,
  raw_data TEXT NOT NULL,
  price REAL NOT NULL,
  change REAL NOT NULL,
  percent REAL NOT NULL,
  fingerprint TEXT NOT NULL,
  data_timestamp_ms BIGINT NOT NULL,
  updated_at_ms BIGINT NOT NULL,
  last_change_at_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // History: append-only, one columnar row per format group per accepted
    // history-write tick. The four CSV columns are co-indexed.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS market_history (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  format_group TEXT NOT NULL,
  codes TEXT NOT NULL,
  prices TEXT NOT NULL,
  changes TEXT NOT NULL,
  percents TEXT NOT NULL,
  data_timestamp_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_history_group_ts
           ON market_history(format_group, data_timestamp_ms);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
