//! Redis-backed job queues
//!
//! Named queues with bounded retry, exponential backoff, a per-job timeout,
//! and a dead-letter list for jobs that exhaust their budget. Layout per
//! queue `name`:
//!
//! - `queue:<name>`: ready list (`LPUSH`/`BRPOP`)
//! - `queue:<name>:delayed`: zset of serialized jobs scored by run-at time
//! - `queue:<name>:dead`: dead-letter list for operator handling
//!
//! Workers call [`run_worker`] with a [`JobHandler`]; the handler decides
//! per job whether to ack, retry, or dead-letter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{DbError, DbResult};

/// Well-known queue names.
pub mod queues {
    /// Merchant payment notifications
    pub const WEBHOOK: &str = "webhook";
    /// Leaderboard aggregation
    pub const ANALYTICS: &str = "analytics";
    /// Leaderboard snapshot computation
    pub const SNAPSHOT: &str = "snapshot";
}

/// How many delayed jobs to promote per poll.
const PROMOTE_BATCH: isize = 100;

/// A queued unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: String,
    pub payload: Value,
    /// 0-based retry counter; 0 on the first delivery attempt
    pub retried: u32,
    pub max_retry: u32,
    pub timeout_secs: u64,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// What a handler decided about a job.
#[derive(Debug)]
pub enum JobOutcome {
    /// Job finished; ack it
    Done,
    /// Retryable failure; backs off and retries until `max_retry`
    Retry(String),
    /// Unrecoverable; goes straight to the dead-letter list
    Dead(String),
}

/// A consumer of one queue.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> JobOutcome;
}

/// Handle to a single named queue.
#[derive(Clone)]
pub struct JobQueue {
    pool: RedisPool,
    name: String,
}

impl JobQueue {
    pub fn new(pool: RedisPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn ready_key(&self) -> String {
        format!("queue:{}", self.name)
    }

    fn delayed_key(&self) -> String {
        format!("queue:{}:delayed", self.name)
    }

    fn dead_key(&self) -> String {
        format!("queue:{}:dead", self.name)
    }

    /// Enqueue a job for immediate delivery.
    pub async fn enqueue(
        &self,
        payload: Value,
        max_retry: u32,
        timeout: Duration,
    ) -> DbResult<Uuid> {
        let job = Job {
            id: Uuid::new_v4(),
            queue: self.name.clone(),
            payload,
            retried: 0,
            max_retry,
            timeout_secs: timeout.as_secs(),
            enqueued_at: Utc::now(),
        };

        let mut conn = self.pool.get().await?;
        conn.lpush::<_, _, ()>(self.ready_key(), serde_json::to_string(&job)?)
            .await?;
        Ok(job.id)
    }

    /// Block for up to `block_secs` waiting for a ready job.
    ///
    /// Due delayed jobs are promoted before blocking.
    pub async fn pop(&self, block_secs: u64) -> DbResult<Option<Job>> {
        self.promote_due().await?;

        let mut conn = self.pool.get().await?;
        let popped: Option<(String, String)> =
            conn.brpop(self.ready_key(), block_secs as f64).await?;
        match popped {
            Some((_, raw)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Move due jobs from the delayed zset to the ready list.
    async fn promote_due(&self) -> DbResult<()> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().timestamp() as f64;
        let due: Vec<String> = conn
            .zrangebyscore_limit(self.delayed_key(), f64::MIN, now, 0, PROMOTE_BATCH)
            .await?;

        for raw in due {
            // only the claimer that removed the member may promote it
            let removed: i32 = conn.zrem(self.delayed_key(), &raw).await?;
            if removed > 0 {
                conn.lpush::<_, _, ()>(self.ready_key(), raw).await?;
            }
        }
        Ok(())
    }

    /// Apply a handler outcome to a popped job.
    pub async fn finish(&self, mut job: Job, outcome: JobOutcome) -> DbResult<()> {
        match outcome {
            JobOutcome::Done => Ok(()),
            JobOutcome::Retry(reason) => {
                job.retried += 1;
                if job.retried >= job.max_retry {
                    warn!(
                        queue = %self.name,
                        job_id = %job.id,
                        retried = job.retried,
                        reason = %reason,
                        "job exhausted retries, moving to dead letter"
                    );
                    self.bury(&job).await
                } else {
                    let delay = backoff(job.retried);
                    let run_at = (Utc::now().timestamp() + delay.as_secs() as i64) as f64;
                    let mut conn = self.pool.get().await?;
                    conn.zadd::<_, _, _, ()>(
                        self.delayed_key(),
                        serde_json::to_string(&job)?,
                        run_at,
                    )
                    .await?;
                    Ok(())
                }
            }
            JobOutcome::Dead(reason) => {
                error!(
                    queue = %self.name,
                    job_id = %job.id,
                    retried = job.retried,
                    reason = %reason,
                    "job dead-lettered"
                );
                self.bury(&job).await
            }
        }
    }

    async fn bury(&self, job: &Job) -> DbResult<()> {
        let mut conn = self.pool.get().await?;
        conn.lpush::<_, _, ()>(self.dead_key(), serde_json::to_string(job)?)
            .await?;
        Ok(())
    }
}

/// Delay before retry `retried` (1-based), capped at 15 minutes.
pub fn backoff(retried: u32) -> Duration {
    let secs = 15u64.saturating_mul(1 << retried.min(10));
    Duration::from_secs(secs.min(900))
}

/// Consume a queue until the task is aborted.
///
/// Each job runs under its own timeout; a timed-out job is treated as a
/// retryable failure.
pub async fn run_worker(queue: JobQueue, handler: Arc<dyn JobHandler>) {
    loop {
        let job = match queue.pop(5).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(err) => {
                warn!(queue = queue.name(), error = %err, "queue pop failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let outcome = match tokio::time::timeout(job.timeout(), handler.handle(&job)).await {
            Ok(outcome) => outcome,
            Err(_) => JobOutcome::Retry(format!("job timed out after {}s", job.timeout_secs)),
        };

        if let Err(err) = queue.finish(job, outcome).await {
            warn!(queue = queue.name(), error = %err, "failed to finalize job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff(1), Duration::from_secs(30));
        assert_eq!(backoff(2), Duration::from_secs(60));
        assert_eq!(backoff(3), Duration::from_secs(120));
        assert_eq!(backoff(4), Duration::from_secs(240));
        // capped at 15 minutes
        assert_eq!(backoff(8), Duration::from_secs(900));
        assert_eq!(backoff(100), Duration::from_secs(900));
    }

    #[test]
    fn test_job_round_trip() {
        let job = Job {
            id: Uuid::new_v4(),
            queue: queues::WEBHOOK.to_string(),
            payload: serde_json::json!({"order_id": 42, "client_id": "c-1"}),
            retried: 3,
            max_retry: 10,
            timeout_secs: 30,
            enqueued_at: Utc::now(),
        };

        let raw = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.retried, 3);
        assert_eq!(back.payload["order_id"], 42);
    }
}
