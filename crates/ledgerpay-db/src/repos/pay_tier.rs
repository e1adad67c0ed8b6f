//! Pay-tier repository
//!
//! Tier rows may be reconfigured live; callers resolve a tier once per
//! transaction and never cache the result across transactions.

use sqlx::{PgExecutor, PgPool};

use crate::{DbResult, PayTier};

/// Resolve the unique tier covering `pay_score`.
///
/// Usable both on a pool and inside a transaction (the refund engine
/// recomputes the merchant tier under the order lock).
pub async fn tier_for_score<'e, E>(executor: E, pay_score: i64) -> Result<Option<PayTier>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, PayTier>(
        r#"
        SELECT * FROM user_pay_configs
        WHERE min_score <= $1 AND (max_score IS NULL OR max_score > $1)
        ORDER BY min_score DESC
        LIMIT 1
        "#,
    )
    .bind(pay_score)
    .fetch_optional(executor)
    .await
}

pub struct PayTierRepo {
    pool: PgPool,
}

impl PayTierRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_for_score(&self, pay_score: i64) -> DbResult<Option<PayTier>> {
        Ok(tier_for_score(&self.pool, pay_score).await?)
    }
}
