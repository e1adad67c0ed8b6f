//! Leaderboard aggregate store
//!
//! `leaderboard_scores` is append-only: the aggregator writes a full batch
//! per run with a shared `updated_at`, and every read resolves the latest
//! write per `(period_type, period_start, metric_type, user_id)` with
//! `DISTINCT ON … ORDER BY updated_at DESC`. Re-running the aggregator for
//! an unchanged period is therefore idempotent at read time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use ledgerpay_core::{MetricType, PeriodType};

use crate::{DbResult, ScoreInsert};

/// Batch boundary for aggregate inserts.
pub const MAX_ROWS_PER_BATCH: usize = 50_000;

/// Shared subquery resolving the latest score per user.
const LATEST_SCORES: &str = r#"
    SELECT DISTINCT ON (user_id) user_id, score
    FROM leaderboard_scores
    WHERE period_type = $1 AND period_start = $2 AND metric_type = $3
    ORDER BY user_id, updated_at DESC
"#;

pub struct ScoreRepo {
    pool: PgPool,
}

impl ScoreRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a batch of aggregate scores, chunked at [`MAX_ROWS_PER_BATCH`].
    ///
    /// Each chunk is one `INSERT … SELECT FROM UNNEST`, so a full batch
    /// costs six bind parameters regardless of row count.
    pub async fn append(&self, rows: &[ScoreInsert]) -> DbResult<u64> {
        let mut inserted = 0u64;

        for chunk in rows.chunks(MAX_ROWS_PER_BATCH) {
            let period_types: Vec<String> =
                chunk.iter().map(|r| r.period_type.to_string()).collect();
            let period_starts: Vec<NaiveDate> = chunk.iter().map(|r| r.period_start).collect();
            let metric_types: Vec<String> =
                chunk.iter().map(|r| r.metric_type.to_string()).collect();
            let user_ids: Vec<i64> = chunk.iter().map(|r| r.user_id).collect();
            let scores: Vec<Decimal> = chunk.iter().map(|r| r.score).collect();
            let updated_ats: Vec<chrono::DateTime<chrono::Utc>> =
                chunk.iter().map(|r| r.updated_at).collect();

            let result = sqlx::query(
                r#"
                INSERT INTO leaderboard_scores
                    (period_type, period_start, metric_type, user_id, score, updated_at)
                SELECT * FROM UNNEST(
                    $1::text[], $2::date[], $3::text[], $4::bigint[], $5::numeric[], $6::timestamptz[]
                )
                "#,
            )
            .bind(&period_types)
            .bind(&period_starts)
            .bind(&metric_types)
            .bind(&user_ids)
            .bind(&scores)
            .bind(&updated_ats)
            .execute(&self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Top scores in descending order, ties broken by ascending user id.
    /// Zero and negative scores are excluded.
    pub async fn list_top(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
        metric: MetricType,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<(i64, Decimal)>> {
        let query = format!(
            r#"
            SELECT user_id, score FROM ({LATEST_SCORES}) latest
            WHERE score > 0
            ORDER BY score DESC, user_id ASC
            LIMIT $4 OFFSET $5
            "#
        );

        let rows: Vec<(i64, Decimal)> = sqlx::query_as(&query)
            .bind(period_type.as_str())
            .bind(period_start)
            .bind(metric.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
