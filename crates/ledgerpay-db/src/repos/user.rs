//! User repository

use sqlx::PgPool;

use crate::{DbResult, User, UserBrief};

pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Load a user only if the account is active. Disabled merchants must
    /// not accept payments.
    pub async fn find_active(&self, id: i64) -> DbResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    /// Batched minimal projection for leaderboard responses.
    pub async fn find_briefs(&self, ids: &[i64]) -> DbResult<Vec<UserBrief>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let briefs = sqlx::query_as::<_, UserBrief>(
            "SELECT id, username, avatar_url FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(briefs)
    }
}
