use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::instruments::{Category, FormatGroup};
use crate::store::model::{HistoryRow, LatestState};
use crate::store::repository::QuoteRepository;

/// SQLx-backed implementation of QuoteRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxQuoteRepository {
    pool: AnyPool,
}

impl SqlxQuoteRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuoteRepository for SqlxQuoteRepository {
    async fn fetch_latest(&self, code: &str) -> Result<Option<LatestState>> {
        let row = sqlx::query(
            r#"
SELECT code, category, format_group, raw_data, price, change, percent,
       fingerprint, data_timestamp_ms, updated_at_ms, last_change_at_ms
FROM market_latest
WHERE code = ?;
"#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_latest(&r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_latest_many(&self, codes: &[String]) -> Result<Vec<LatestState>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = codes.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            r#"
SELECT code, category, format_group, raw_data, price, change, percent,
       fingerprint, data_timestamp_ms, updated_at_ms, last_change_at_ms
FROM market_latest
WHERE code IN ({placeholders});
"#
        );

        let mut query = sqlx::query(&sql);
        for code in codes {
            query = query.bind(code);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_latest(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the read
                    tracing::warn!(error = %e, "skipping malformed latest-state row");
                }
            }
        }

        Ok(out)
    }

    async fn upsert_latest(&self, state: &LatestState) -> Result<()> {
        sqlx::query(
            r#"
INSERT OR REPLACE INTO market_latest
  (code, category, format_group, raw_data, price, change, percent,
   fingerprint, data_timestamp_ms, updated_at_ms, last_change_at_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(&state.code)
        .bind(state.category.as_str())
        .bind(state.format_group.as_str())
        .bind(&state.raw)
        .bind(state.price)
        .bind(state.change)
        .bind(state.percent)
        .bind(&state.fingerprint)
        .bind(state.data_timestamp_ms)
        .bind(state.updated_at_ms)
        .bind(state.last_change_at_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_history(&self, row: &HistoryRow) -> Result<()> {
        sqlx::query(
            r#"
INSERT INTO market_history
  (format_group, codes, prices, changes, percents, data_timestamp_ms)
VALUES (?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(row.format_group.as_str())
        .bind(&row.codes)
        .bind(&row.prices)
        .bind(&row.changes)
        .bind(&row.percents)
        .bind(row.data_timestamp_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_history(
        &self,
        group: FormatGroup,
        since_ms: i64,
        limit: u32,
    ) -> Result<Vec<HistoryRow>> {
        let rows = sqlx::query(
            r#"
SELECT format_group, codes, prices, changes, percents, data_timestamp_ms
FROM market_history
WHERE format_group = ? AND data_timestamp_ms >= ?
ORDER BY data_timestamp_ms DESC
LIMIT ?;
"#,
        )
        .bind(group.as_str())
        .bind(since_ms)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_history(&r) {
                Ok(h) => out.push(h),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed history row");
                }
            }
        }

        Ok(out)
    }

    async fn prune_history(&self, cutoff_ms: i64) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM market_history WHERE data_timestamp_ms < ?;"#)
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/* =========================
Row mapping
========================= */

fn row_to_latest(r: &sqlx::any::AnyRow) -> Result<LatestState> {
    let category_str: String = r.get("category");
    let category = Category::parse(&category_str)
        .ok_or_else(|| anyhow!("unknown category: {category_str}"))?;

    let group_str: String = r.get("format_group");
    let format_group = FormatGroup::parse(&group_str)
        .ok_or_else(|| anyhow!("unknown format group: {group_str}"))?;

    Ok(LatestState {
        code: r.get::<String, _>("code"),
        category,
        format_group,
        raw: r.get::<String, _>("raw_data"),
        price: r.get::<f64, _>("price"),
        change: r.get::<f64, _>("change"),
        percent: r.get::<f64, _>("percent"),
        fingerprint: r.get::<String, _>("fingerprint"),
        data_timestamp_ms: r.get::<i64, _>("data_timestamp_ms"),
        updated_at_ms: r.get::<i64, _>("updated_at_ms"),
        last_change_at_ms: r.get::<i64, _>("last_change_at_ms"),
    })
}

fn row_to_history(r: &sqlx::any::AnyRow) -> Result<HistoryRow> {
    let group_str: String = r.get("format_group");
    let format_group = FormatGroup::parse(&group_str)
        .ok_or_else(|| anyhow!("unknown format group: {group_str}"))?;

    Ok(HistoryRow {
        format_group,
        codes: r.get::<String, _>("codes"),
        prices: r.get::<String, _>("prices"),
        changes: r.get::<String, _>("changes"),
        percents: r.get::<String, _>("percents"),
        data_timestamp_ms: r.get::<i64, _>("data_timestamp_ms"),
    })
}
