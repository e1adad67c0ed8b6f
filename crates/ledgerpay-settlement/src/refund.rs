//! Compensating refund
//!
//! Reverses a settled payment when the merchant callback is exhausted. The
//! refund mirrors settlement grossly: the merchant is debited the full
//! amount (netting out `−fee` across settle+refund) and the payer's
//! `pay_score` is decremented a second time rather than restored. Both are
//! deliberate ports of the reference behaviour.

use chrono::Utc;
use tracing::{info, warn};

use ledgerpay_core::money::round0;
use ledgerpay_core::{OrderStatus, OrderType, PayError};
use ledgerpay_db::{is_lock_not_available, repos, Database, User};

use crate::EngineError;

/// What the refund did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    /// Money and scores were reversed; the order is now `refund`
    Refunded,
    /// Order missing, not `success`, or locked by a concurrent
    /// settlement/refund; nothing to do
    AlreadyHandled,
    /// Only merchant-payment orders are refundable
    UnsupportedType,
}

/// Idempotently refund a settled order.
///
/// Lock conflicts and missing rows are no-ops, not errors: the order is
/// either already refunded or being handled elsewhere, and the notifier may
/// safely retry.
pub async fn refund_order(db: &Database, order_id: i64) -> Result<RefundOutcome, EngineError> {
    let mut tx = db.pg.begin().await?;

    let order = match repos::lock_success_nowait(&mut tx, order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            info!(order_id, "order already handled, skipping refund");
            return Ok(RefundOutcome::AlreadyHandled);
        }
        Err(err) if is_lock_not_available(&err) => {
            info!(order_id, "order locked by concurrent transaction, skipping refund");
            return Ok(RefundOutcome::AlreadyHandled);
        }
        Err(err) => return Err(err.into()),
    };

    if order.order_type != OrderType::Payment {
        info!(order_id, order_type = %order.order_type, "order type not refundable");
        return Ok(RefundOutcome::UnsupportedType);
    }
    order.status.transition(OrderStatus::Refund)?;

    // the merchant tier is recomputed from the payee's current score, which
    // may differ from the tier used at settlement
    let merchant: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(order.payee_user_id)
        .fetch_one(&mut *tx)
        .await?;
    let merchant_tier = repos::tier_for_score(&mut *tx, merchant.pay_score)
        .await?
        .ok_or(PayError::PayConfigNotFound)?;
    let merchant_score = round0(order.amount * merchant_tier.score_rate);

    sqlx::query(
        r#"
        UPDATE users
        SET available_balance = available_balance - $2,
            total_receive = total_receive - $2,
            pay_score = pay_score - $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(order.payee_user_id)
    .bind(order.amount)
    .bind(merchant_score)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE users
        SET available_balance = available_balance + $2,
            total_payment = total_payment - $2,
            pay_score = pay_score - $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(order.payer_user_id)
    .bind(order.amount)
    .bind(round0(order.amount))
    .execute(&mut *tx)
    .await?;

    repos::mark_refund(&mut tx, order.id).await?;
    tx.commit().await?;

    warn!(
        order_id,
        amount = %order.amount,
        payer_id = order.payer_user_id,
        merchant_id = order.payee_user_id,
        refunded_at = %Utc::now(),
        "order refunded after failed merchant notification"
    );
    Ok(RefundOutcome::Refunded)
}
