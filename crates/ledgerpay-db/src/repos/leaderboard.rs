//! Realtime leaderboard queries
//!
//! The fallback path when no fresh snapshot exists, and the authoritative
//! path for deep pages. Only successful `payment`/`online`/`transfer`
//! orders between distinct users count, windowed by `trade_time`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use ledgerpay_core::MetricType;

use crate::DbResult;

/// One realtime leaderboard row, already joined with user info.
#[derive(Debug, Clone, FromRow)]
pub struct RealtimeEntry {
    pub user_id: i64,
    pub username: String,
    pub avatar_url: String,
    pub score: Decimal,
}

/// Shared ranked subquery; the metric expression is the single dynamic part
/// and comes from [`MetricType::order_expr`], never from user input.
fn ranked_subquery(metric: MetricType) -> String {
    format!(
        r#"
        SELECT users.id AS user_id, users.username, users.avatar_url, {expr} AS score
        FROM users
        JOIN orders ON (orders.payer_user_id = users.id OR orders.payee_user_id = users.id)
        WHERE orders.status = 'success'
          AND orders.type IN ('payment', 'online', 'transfer')
          AND orders.payer_user_id <> orders.payee_user_id
          AND orders.trade_time >= $1 AND orders.trade_time < $2
        GROUP BY users.id, users.username, users.avatar_url
        "#,
        expr = metric.order_expr()
    )
}

pub struct LeaderboardRepo {
    pool: PgPool,
}

impl LeaderboardRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One page of the realtime ranking.
    pub async fn list(
        &self,
        metric: MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<RealtimeEntry>> {
        let query = format!(
            r#"
            SELECT user_id, username, avatar_url, score FROM ({inner}) ranked
            WHERE score > 0
            ORDER BY score DESC, user_id ASC
            LIMIT $3 OFFSET $4
            "#,
            inner = ranked_subquery(metric)
        );

        let rows = sqlx::query_as::<_, RealtimeEntry>(&query)
            .bind(start)
            .bind(end)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total users with a positive score in the window.
    pub async fn count(
        &self,
        metric: MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<i64> {
        let query = format!(
            "SELECT COUNT(*) FROM ({inner}) ranked WHERE score > 0",
            inner = ranked_subquery(metric)
        );
        let (count,): (i64,) = sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// A single user's score in the window (zero when inactive).
    pub async fn user_score(
        &self,
        metric: MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: i64,
    ) -> DbResult<Decimal> {
        let query = format!(
            "SELECT score FROM ({inner}) ranked WHERE user_id = $3",
            inner = ranked_subquery(metric)
        );
        let row: Option<(Decimal,)> = sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(score,)| score).unwrap_or(Decimal::ZERO))
    }

    /// 1-based rank of `(score, user_id)` among positive scorers.
    pub async fn user_rank(
        &self,
        metric: MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        score: Decimal,
        user_id: i64,
    ) -> DbResult<i64> {
        let query = format!(
            r#"
            SELECT COUNT(*) FROM ({inner}) ranked
            WHERE score > 0 AND (score > $3 OR (score = $3 AND user_id < $4))
            "#,
            inner = ranked_subquery(metric)
        );
        let (ahead,): (i64,) = sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .bind(score)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(ahead + 1)
    }
}
