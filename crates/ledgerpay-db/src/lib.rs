//! LedgerPay persistence layer
//!
//! - **PostgreSQL**: authoritative ledger: users, orders, pay tiers,
//!   merchant API keys, leaderboard snapshots, and the append-only
//!   `leaderboard_scores` aggregate table
//! - **Redis**: checkout-token index, read-through response caches, and
//!   the named job queues (`webhook`, `analytics`, `snapshot`)
//!
//! Each domain area has its own repository. Multi-row money-moving
//! transactions are owned by the settlement engine, which borrows a
//! connection from the pool here.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod repos;

use sqlx::postgres::{PgPool, PgPoolOptions};

use deadpool_redis::{Config as RedisConfig, Pool as RedisPool, Runtime};
use tracing::info;

pub use config::DatabaseConfig;
pub use error::{is_lock_not_available, DbError, DbResult};
pub use models::*;
pub use queue::{queues, Job, JobHandler, JobOutcome, JobQueue};
pub use repos::*;

/// Database connection pools.
pub struct Database {
    /// PostgreSQL connection pool
    pub pg: PgPool,
    /// Redis connection pool
    pub redis: RedisPool,
}

impl Database {
    /// Connect to PostgreSQL and Redis, verifying both are reachable.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("connecting to PostgreSQL: {}", config.postgres_url_masked());

        let pg = PgPoolOptions::new()
            .max_connections(config.pg_max_connections)
            .min_connections(config.pg_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.pg_acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| DbError::Connection(format!("PostgreSQL: {e}")))?;

        info!("connecting to Redis: {}", config.redis_url_masked());

        let redis = RedisConfig::from_url(&config.redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DbError::Connection(format!("Redis: {e}")))?;

        let mut conn = redis
            .get()
            .await
            .map_err(|e| DbError::Connection(format!("Redis pool: {e}")))?;
        let _: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| DbError::Connection(format!("Redis ping: {e}")))?;

        Ok(Self { pg, redis })
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> DbResult<()> {
        info!("running database migrations");
        sqlx::migrate!("../../migrations")
            .run(&self.pg)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Check both stores.
    pub async fn health_check(&self) -> DbResult<HealthStatus> {
        let postgres = sqlx::query("SELECT 1").fetch_one(&self.pg).await.is_ok();

        let redis = async {
            let mut conn = self.redis.get().await.ok()?;
            deadpool_redis::redis::cmd("PING")
                .query_async::<String>(&mut *conn)
                .await
                .ok()
        }
        .await
        .is_some();

        Ok(HealthStatus {
            postgres,
            redis,
            healthy: postgres && redis,
        })
    }

    pub fn user_repo(&self) -> UserRepo {
        UserRepo::new(self.pg.clone())
    }

    pub fn order_repo(&self) -> OrderRepo {
        OrderRepo::new(self.pg.clone())
    }

    pub fn pay_tier_repo(&self) -> PayTierRepo {
        PayTierRepo::new(self.pg.clone())
    }

    pub fn merchant_key_repo(&self) -> MerchantKeyRepo {
        MerchantKeyRepo::new(self.pg.clone())
    }

    pub fn score_repo(&self) -> ScoreRepo {
        ScoreRepo::new(self.pg.clone())
    }

    pub fn ranking_repo(&self) -> RankingRepo {
        RankingRepo::new(self.pg.clone())
    }

    pub fn leaderboard_repo(&self) -> LeaderboardRepo {
        LeaderboardRepo::new(self.pg.clone())
    }

    pub fn cache(&self) -> cache::CacheManager {
        cache::CacheManager::new(self.redis.clone())
    }

    /// Handle to a named job queue.
    pub fn queue(&self, name: &str) -> JobQueue {
        JobQueue::new(self.redis.clone(), name)
    }
}

/// Health status of both stores.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub postgres: bool,
    pub redis: bool,
    pub healthy: bool,
}
