//! Merchant notification engine
//!
//! Consumes the `webhook` queue and delivers signed EPay-style callbacks to
//! merchant `notify_url`s. Delivery is at-least-once; after five failed
//! attempts the settled order is compensated with an idempotent refund, and
//! a failed refund parks the job in the dead-letter list for operators.

mod callback;
mod worker;

pub use callback::{
    build_callback_params, send_callback, signed_notify_url, CallbackError, PAY_TYPE, USER_AGENT,
};
pub use worker::{spawn_notify_worker, NotifyHandler, REFUND_AFTER_RETRIES};
