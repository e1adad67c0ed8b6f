//! Leaderboard snapshot repository
//!
//! `trading_leaderboard_rankings` stores materialised Top-N snapshots. All
//! rows of one snapshot share `snapshot_at`; reads always address the most
//! recent snapshot of a `(period_type, period_start, metric)` series.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ledgerpay_core::{MetricType, PeriodType};

use crate::{DbResult, LeaderboardRanking, RankingInsert};

pub struct RankingRepo {
    pool: PgPool,
}

impl RankingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one snapshot's rows in a single statement.
    pub async fn insert(&self, rows: &[RankingInsert]) -> DbResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let period_types: Vec<String> = rows.iter().map(|r| r.period_type.to_string()).collect();
        let period_starts: Vec<NaiveDate> = rows.iter().map(|r| r.period_start).collect();
        let period_ends: Vec<NaiveDate> = rows.iter().map(|r| r.period_end).collect();
        let metrics: Vec<String> = rows.iter().map(|r| r.metric.to_string()).collect();
        let snapshot_ats: Vec<DateTime<Utc>> = rows.iter().map(|r| r.snapshot_at).collect();
        let ranks: Vec<i32> = rows.iter().map(|r| r.rank).collect();
        let user_ids: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
        let scores: Vec<Decimal> = rows.iter().map(|r| r.score).collect();
        let previous_ranks: Vec<Option<i32>> = rows.iter().map(|r| r.previous_rank).collect();
        let trends: Vec<Option<String>> = rows
            .iter()
            .map(|r| r.trend.map(|t| t.to_string()))
            .collect();

        let result = sqlx::query(
            r#"
            INSERT INTO trading_leaderboard_rankings
                (period_type, period_start, period_end, metric, snapshot_at,
                 rank, user_id, score, previous_rank, trend)
            SELECT * FROM UNNEST(
                $1::text[], $2::date[], $3::date[], $4::text[], $5::timestamptz[],
                $6::int4[], $7::bigint[], $8::numeric[], $9::int4[], $10::text[]
            )
            "#,
        )
        .bind(&period_types)
        .bind(&period_starts)
        .bind(&period_ends)
        .bind(&metrics)
        .bind(&snapshot_ats)
        .bind(&ranks)
        .bind(&user_ids)
        .bind(&scores)
        .bind(&previous_ranks)
        .bind(&trends)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Timestamp of the most recent snapshot in a series.
    pub async fn latest_snapshot_at(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
        metric: MetricType,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let (snapshot_at,): (Option<DateTime<Utc>>,) = sqlx::query_as(
            r#"
            SELECT MAX(snapshot_at) FROM trading_leaderboard_rankings
            WHERE period_type = $1 AND period_start = $2 AND metric = $3
            "#,
        )
        .bind(period_type.as_str())
        .bind(period_start)
        .bind(metric.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(snapshot_at)
    }

    /// Ranked rows of one snapshot, lowest rank first.
    pub async fn rows_at(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
        metric: MetricType,
        snapshot_at: DateTime<Utc>,
        max_rank: i32,
    ) -> DbResult<Vec<LeaderboardRanking>> {
        let rows = sqlx::query_as::<_, LeaderboardRanking>(
            r#"
            SELECT * FROM trading_leaderboard_rankings
            WHERE period_type = $1 AND period_start = $2 AND metric = $3
              AND snapshot_at = $4 AND rank <= $5
            ORDER BY rank ASC
            "#,
        )
        .bind(period_type.as_str())
        .bind(period_start)
        .bind(metric.as_str())
        .bind(snapshot_at)
        .bind(max_rank)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// A single user's row in one snapshot.
    pub async fn user_row_at(
        &self,
        period_type: PeriodType,
        period_start: NaiveDate,
        metric: MetricType,
        snapshot_at: DateTime<Utc>,
        user_id: i64,
    ) -> DbResult<Option<LeaderboardRanking>> {
        let row = sqlx::query_as::<_, LeaderboardRanking>(
            r#"
            SELECT * FROM trading_leaderboard_rankings
            WHERE period_type = $1 AND period_start = $2 AND metric = $3
              AND snapshot_at = $4 AND user_id = $5
            "#,
        )
        .bind(period_type.as_str())
        .bind(period_start)
        .bind(metric.as_str())
        .bind(snapshot_at)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
