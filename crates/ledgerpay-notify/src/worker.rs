//! Webhook queue worker

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use ledgerpay_core::OrderStatus;
use ledgerpay_db::{queue, queues, Database, Job, JobHandler, JobOutcome};
use ledgerpay_settlement::refund_order;

use crate::callback::{build_callback_params, send_callback, signed_notify_url, USER_AGENT};

/// Delivery failures observed at this retry count (0-based) or beyond
/// trigger the refund, i.e. the refund fires on the 5th failed attempt.
pub const REFUND_AFTER_RETRIES: u32 = 4;

#[derive(Debug, Deserialize)]
struct NotifyPayload {
    order_id: i64,
    client_id: String,
}

/// Handler for `webhook` queue jobs.
pub struct NotifyHandler {
    db: Arc<Database>,
    http: reqwest::Client,
}

impl NotifyHandler {
    pub fn new(db: Arc<Database>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { db, http }
    }

    async fn deliver(&self, payload: &NotifyPayload, retry_count: u32) -> JobOutcome {
        let order = match self.db.order_repo().find_by_id(payload.order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                info!(order_id = payload.order_id, "order missing, skipping callback");
                return JobOutcome::Done;
            }
            Err(err) => return JobOutcome::Retry(format!("load order: {err}")),
        };
        if order.status != OrderStatus::Success {
            info!(
                order_id = order.id,
                status = %order.status,
                "order no longer successful, skipping callback"
            );
            return JobOutcome::Done;
        }

        let api_key = match self
            .db
            .merchant_key_repo()
            .find_by_client_id(&payload.client_id)
            .await
        {
            Ok(Some(key)) => key,
            Ok(None) => {
                return JobOutcome::Retry(format!("merchant api key {} not found", payload.client_id))
            }
            Err(err) => return JobOutcome::Retry(format!("load api key: {err}")),
        };

        let params = build_callback_params(&order, &api_key);
        let url = match signed_notify_url(&api_key.notify_url, &params) {
            Ok(url) => url,
            Err(err) => return self.exhaust_or_retry(payload, retry_count, err.to_string()).await,
        };

        match send_callback(&self.http, url).await {
            Ok(()) => {
                info!(
                    order_id = order.id,
                    client_id = %payload.client_id,
                    retry_count,
                    "merchant callback delivered"
                );
                JobOutcome::Done
            }
            Err(err) => self.exhaust_or_retry(payload, retry_count, err.to_string()).await,
        }
    }

    /// A delivery attempt failed: retry, or refund once the budget is spent.
    async fn exhaust_or_retry(
        &self,
        payload: &NotifyPayload,
        retry_count: u32,
        reason: String,
    ) -> JobOutcome {
        error!(
            order_id = payload.order_id,
            client_id = %payload.client_id,
            retry_count,
            reason = %reason,
            "merchant callback failed"
        );

        if retry_count < REFUND_AFTER_RETRIES {
            return JobOutcome::Retry(reason);
        }

        error!(
            order_id = payload.order_id,
            client_id = %payload.client_id,
            retry_count,
            "callback retries exhausted, refunding order"
        );
        match refund_order(&self.db, payload.order_id).await {
            Ok(outcome) => {
                info!(order_id = payload.order_id, ?outcome, "automatic refund completed");
                JobOutcome::Done
            }
            Err(err) => JobOutcome::Dead(format!("callback failed and refund failed: {err}")),
        }
    }
}

#[async_trait]
impl JobHandler for NotifyHandler {
    async fn handle(&self, job: &Job) -> JobOutcome {
        let payload: NotifyPayload = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(err) => return JobOutcome::Dead(format!("malformed webhook payload: {err}")),
        };
        self.deliver(&payload, job.retried).await
    }
}

/// Spawn the webhook consumer task.
pub fn spawn_notify_worker(db: Arc<Database>) -> JoinHandle<()> {
    let queue = db.queue(queues::WEBHOOK);
    let handler: Arc<dyn JobHandler> = Arc::new(NotifyHandler::new(db));
    tokio::spawn(queue::run_worker(queue, handler))
}
