//! Redis cache manager
//!
//! Read-through response caching for the leaderboard surface and the
//! short-lived `order_no → merchant_id` checkout index. The cache is never
//! authoritative; staleness is bounded by TTL and there is no explicit
//! invalidation.

use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::{DbError, DbResult};

/// Cache key builders
pub mod keys {
    /// Checkout index entry: `order:<order_no>` → merchant user id.
    pub fn order_token(order_no: &str) -> String {
        format!("order:{order_no}")
    }

    /// Cached leaderboard list response.
    ///
    /// `period_start` is the local-midnight period start as `yyyymmdd`.
    pub fn leaderboard_list(
        period: &str,
        metric: &str,
        period_start: &str,
        page: u32,
        page_size: u32,
    ) -> String {
        format!("leaderboard:list:{period}:{metric}:{period_start}:{page}:{page_size}")
    }
}

/// Cache TTLs
pub mod ttl {
    use std::time::Duration;

    /// Checkout window for order tokens
    pub const ORDER_TOKEN: Duration = Duration::from_secs(30 * 60);
    /// Leaderboard list responses
    pub const LEADERBOARD_LIST: Duration = Duration::from_secs(5 * 60);
}

pub struct CacheManager {
    pool: RedisPool,
}

impl CacheManager {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Set a JSON value with expiration.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> DbResult<()> {
        let mut conn = self.pool.get().await?;
        let json = serde_json::to_string(value)?;
        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs()).await?;
        Ok(())
    }

    /// Get a JSON value.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Checkout index
    // =========================================================================

    /// Register an order token for the checkout window.
    pub async fn set_order_merchant(&self, order_no: &str, merchant_id: i64) -> DbResult<()> {
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(
            keys::order_token(order_no),
            merchant_id,
            ttl::ORDER_TOKEN.as_secs(),
        )
        .await?;
        Ok(())
    }

    /// Resolve an order token to its merchant, if still within the window.
    pub async fn get_order_merchant(&self, order_no: &str) -> DbResult<Option<i64>> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(keys::order_token(order_no)).await?;
        match raw {
            Some(value) => value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| DbError::InvalidInput(format!("corrupt checkout index: {value}"))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(keys::order_token("abc"), "order:abc");
        assert_eq!(
            keys::leaderboard_list("week", "volume_amount", "20260727", 1, 20),
            "leaderboard:list:week:volume_amount:20260727:1:20"
        );
    }
}
