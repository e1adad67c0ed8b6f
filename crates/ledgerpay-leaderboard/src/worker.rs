//! Queue workers for the leaderboard jobs
//!
//! The schedulers only enqueue; the actual work runs in queue consumers so
//! a crashed run is retried from the queue. Both jobs are idempotent, so
//! redelivery is harmless.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

use ledgerpay_core::PeriodType;
use ledgerpay_db::{queue, queues, Database, DbResult, Job, JobHandler, JobOutcome};

use crate::{aggregate, snapshot};

const JOB_MAX_RETRY: u32 = 3;

/// Aggregation can scan a lot of orders; give it room.
const JOB_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Default, Deserialize)]
struct SyncPayload {
    #[serde(default)]
    period_types: Vec<PeriodType>,
}

/// Queue a score-sync job (all period types when empty).
pub async fn enqueue_sync(db: &Database, period_types: &[PeriodType]) -> DbResult<()> {
    db.queue(queues::ANALYTICS)
        .enqueue(
            json!({ "period_types": period_types }),
            JOB_MAX_RETRY,
            JOB_TIMEOUT,
        )
        .await?;
    Ok(())
}

/// Queue a snapshot run.
pub async fn enqueue_snapshots(db: &Database) -> DbResult<()> {
    db.queue(queues::SNAPSHOT)
        .enqueue(json!({}), JOB_MAX_RETRY, JOB_TIMEOUT)
        .await?;
    Ok(())
}

struct AnalyticsHandler {
    db: Arc<Database>,
}

#[async_trait]
impl JobHandler for AnalyticsHandler {
    async fn handle(&self, job: &Job) -> JobOutcome {
        let payload: SyncPayload =
            serde_json::from_value(job.payload.clone()).unwrap_or_default();

        match aggregate::sync_scores(&self.db, &payload.period_types).await {
            Ok(rows) => {
                info!(job_id = %job.id, rows, "leaderboard score sync finished");
                JobOutcome::Done
            }
            Err(err) => JobOutcome::Retry(format!("score sync: {err}")),
        }
    }
}

struct SnapshotHandler {
    db: Arc<Database>,
}

#[async_trait]
impl JobHandler for SnapshotHandler {
    async fn handle(&self, job: &Job) -> JobOutcome {
        match snapshot::run_snapshots(&self.db).await {
            Ok(()) => {
                info!(job_id = %job.id, "leaderboard snapshot run finished");
                JobOutcome::Done
            }
            Err(err) => JobOutcome::Retry(format!("snapshot run: {err}")),
        }
    }
}

/// Spawn the `analytics` queue consumer.
pub fn spawn_analytics_worker(db: Arc<Database>) -> JoinHandle<()> {
    let q = db.queue(queues::ANALYTICS);
    let handler: Arc<dyn JobHandler> = Arc::new(AnalyticsHandler { db });
    tokio::spawn(queue::run_worker(q, handler))
}

/// Spawn the `snapshot` queue consumer.
pub fn spawn_snapshot_worker(db: Arc<Database>) -> JoinHandle<()> {
    let q = db.queue(queues::SNAPSHOT);
    let handler: Arc<dyn JobHandler> = Arc::new(SnapshotHandler { db });
    tokio::spawn(queue::run_worker(q, handler))
}
