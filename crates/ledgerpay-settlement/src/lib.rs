//! LedgerPay settlement engine
//!
//! The money-moving core of the platform:
//!
//! - [`resolve_order_token`]: turn an opaque checkout token into a
//!   [`SettlementContext`] (merchant, payer, both pay tiers)
//! - [`settle`]: the atomic payment transaction: daily-limit check under a
//!   per-payer-per-day advisory lock, guarded balance debit, fee-net
//!   merchant credit, score updates, order finalisation, webhook enqueue
//! - [`refund_order`]: idempotent compensation when merchant notification
//!   is exhausted
//!
//! Every numeric update is an atomic column expression
//! (`column = column ± value`); concurrent settlements on disjoint users do
//! not serialise.

mod context;
mod engine;
mod limit;
mod refund;

use thiserror::Error;

use ledgerpay_core::types::IllegalTransition;
use ledgerpay_core::PayError;
use ledgerpay_db::DbError;

pub use context::{resolve_order_token, validate_test_mode, SettlementContext};
pub use engine::{
    create_merchant_order, enqueue_merchant_notify, settle, transfer, Settled, NOTIFY_MAX_RETRY,
    NOTIFY_TIMEOUT,
};
pub use limit::advisory_lock_key;
pub use refund::{refund_order, RefundOutcome};

/// Settlement-engine failures.
///
/// User-visible kinds pass through as [`PayError`]; everything else is an
/// infrastructure failure that rolled the transaction back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Pay(#[from] PayError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("order state error: {0}")]
    State(#[from] IllegalTransition),
}

impl EngineError {
    /// The user-visible error, if this is one.
    pub fn as_pay_error(&self) -> Option<PayError> {
        match self {
            Self::Pay(err) => Some(*err),
            _ => None,
        }
    }
}
