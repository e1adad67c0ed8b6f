//! The settlement transaction

use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info};

use ledgerpay_core::money::{round0, split_fee};
use ledgerpay_core::{OrderStatus, PayError};
use ledgerpay_db::{queues, repos, Database, DbError, NewOrder, Order, User};

use crate::limit::check_daily_limit;
use crate::{EngineError, SettlementContext};

/// Webhook delivery budget: the job may be redelivered up to this many times.
pub const NOTIFY_MAX_RETRY: u32 = 10;

/// End-to-end budget for one callback attempt.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a committed settlement.
#[derive(Debug, Clone)]
pub struct Settled {
    pub order: Order,
    pub fee: Decimal,
    pub merchant_amount: Decimal,
}

/// Settle a pending order for the context's payer.
///
/// Commits one transaction that debits the payer, credits the merchant net
/// of fee, applies both score deltas, and finalises the order row; then
/// enqueues the merchant notification. The payer row is never read inside
/// the transaction; the balance guard (`available_balance >= amount`) and
/// atomic column expressions make read-modify-write unnecessary.
pub async fn settle(db: &Database, ctx: &SettlementContext) -> Result<Settled, EngineError> {
    let now = Utc::now();
    let mut tx = db.pg.begin().await?;

    let order = repos::lock_by_id(&mut tx, ctx.order_id)
        .await?
        .ok_or(PayError::OrderNotFound)?;
    order
        .status
        .transition(OrderStatus::Success)
        .map_err(|_| PayError::OrderAlreadySettled)?;

    let (fee, merchant_amount) = split_fee(order.amount, ctx.merchant_tier.fee_rate);

    check_daily_limit(&mut tx, ctx.payer.id, &ctx.payer_tier, order.amount, now).await?;

    // guarded debit: zero rows updated means the balance no longer covers
    // the amount, even though the pre-transaction read looked fine
    let debited = sqlx::query(
        r#"
        UPDATE users
        SET available_balance = available_balance - $2,
            total_payment = total_payment + $2,
            pay_score = pay_score - $3,
            updated_at = NOW()
        WHERE id = $1 AND available_balance >= $2
        "#,
    )
    .bind(ctx.payer.id)
    .bind(order.amount)
    .bind(round0(order.amount))
    .execute(&mut *tx)
    .await?;
    if debited.rows_affected() == 0 {
        return Err(PayError::InsufficientBalance.into());
    }

    // merchant receives net of fee but total_receive counts gross
    let merchant_score = round0(order.amount * ctx.merchant_tier.score_rate);
    sqlx::query(
        r#"
        UPDATE users
        SET available_balance = available_balance + $2,
            total_receive = total_receive + $3,
            pay_score = pay_score + $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(ctx.merchant.id)
    .bind(merchant_amount)
    .bind(order.amount)
    .bind(merchant_score)
    .execute(&mut *tx)
    .await?;

    repos::mark_success(&mut tx, order.id, ctx.payer.id, fee, now).await?;
    tx.commit().await?;

    info!(
        order_id = order.id,
        payer_id = ctx.payer.id,
        merchant_id = ctx.merchant.id,
        amount = %order.amount,
        fee = %fee,
        "order settled"
    );

    if let Err(err) = enqueue_merchant_notify(db, order.id, &ctx.api_key.client_id).await {
        // the settlement is committed; delivery is at-least-once and a
        // missed enqueue surfaces in the dead-letter/ops path
        error!(
            order_id = order.id,
            client_id = %ctx.api_key.client_id,
            error = %err,
            "failed to enqueue merchant notification"
        );
    }

    let order = Order {
        status: OrderStatus::Success,
        payer_user_id: ctx.payer.id,
        fee,
        trade_time: Some(now),
        ..order
    };
    Ok(Settled {
        order,
        fee,
        merchant_amount,
    })
}

/// Queue the signed merchant callback for a settled order.
pub async fn enqueue_merchant_notify(
    db: &Database,
    order_id: i64,
    client_id: &str,
) -> Result<(), DbError> {
    db.queue(queues::WEBHOOK)
        .enqueue(
            json!({ "order_id": order_id, "client_id": client_id }),
            NOTIFY_MAX_RETRY,
            NOTIFY_TIMEOUT,
        )
        .await?;
    Ok(())
}

/// Move money directly between two distinct users.
///
/// Transfers bypass fees, scores, and the daily limit; they settle
/// immediately as a `transfer` order so the leaderboard sees them.
pub async fn transfer(
    db: &Database,
    from_user_id: i64,
    to_user_id: i64,
    amount: Decimal,
    name: &str,
) -> Result<Order, EngineError> {
    if from_user_id == to_user_id {
        return Err(PayError::CannotPaySelf.into());
    }

    let now = Utc::now();
    let mut tx = db.pg.begin().await?;

    let debited = sqlx::query(
        r#"
        UPDATE users
        SET available_balance = available_balance - $2,
            total_transfer = total_transfer + $2,
            updated_at = NOW()
        WHERE id = $1 AND available_balance >= $2
        "#,
    )
    .bind(from_user_id)
    .bind(amount)
    .execute(&mut *tx)
    .await?;
    if debited.rows_affected() == 0 {
        return Err(PayError::InsufficientBalance.into());
    }

    sqlx::query(
        r#"
        UPDATE users
        SET available_balance = available_balance + $2,
            total_transfer = total_transfer + $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(to_user_id)
    .bind(amount)
    .execute(&mut *tx)
    .await?;

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (type, status, payer_user_id, payee_user_id, name, amount, fee, merchant_order_no, trade_time)
        VALUES ('transfer', 'success', $1, $2, $3, $4, 0, '', $5)
        RETURNING *
        "#,
    )
    .bind(from_user_id)
    .bind(to_user_id)
    .bind(name)
    .bind(amount)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        order_id = order.id,
        from_user_id,
        to_user_id,
        amount = %amount,
        "transfer completed"
    );
    Ok(order)
}

/// Create a pending merchant order and register its checkout token.
///
/// Returns the order and the opaque `order_no` the payer's browser will
/// present; the token expires with the checkout window. Resubmitting a
/// `merchant_order_no` re-issues a token for the existing pending order;
/// a settled or refunded one fails `OrderAlreadySettled`.
pub async fn create_merchant_order(
    db: &Database,
    merchant: &User,
    new_order: &NewOrder,
) -> Result<(Order, String), EngineError> {
    let existing = db
        .order_repo()
        .find_by_merchant_order_no(merchant.id, &new_order.merchant_order_no)
        .await?;

    let order = match existing {
        Some(order) if order.status == OrderStatus::Pending => order,
        Some(_) => return Err(PayError::OrderAlreadySettled.into()),
        None => db.order_repo().create(new_order).await?,
    };

    let order_no = ledgerpay_core::crypto::encrypt(&merchant.sign_key, &order.id.to_string())
        .map_err(|_| PayError::OrderNoFormatError)?;
    db.cache().set_order_merchant(&order_no, merchant.id).await?;

    info!(order_id = order.id, merchant_id = merchant.id, "merchant order created");
    Ok((order, order_no))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_settlement_arithmetic() {
        // 50.00 at fee_rate 0.03, score_rate 0.05
        let (fee, merchant_amount) = split_fee(dec!(50.00), dec!(0.03));
        assert_eq!(fee, dec!(1.50));
        assert_eq!(merchant_amount, dec!(48.50));

        // payer loses round0(50) = 50 score; merchant gains round0(50*0.05) = 3
        assert_eq!(round0(dec!(50.00)), 50);
        assert_eq!(round0(dec!(50.00) * dec!(0.05)), 3);
    }

    #[test]
    fn test_balance_deltas_sum_to_minus_fee() {
        // settlement invariant: payer delta + merchant delta == -fee
        let amount = dec!(33.33);
        let (fee, merchant_amount) = split_fee(amount, dec!(0.07));
        let payer_delta = -amount;
        let merchant_delta = merchant_amount;
        assert_eq!(payer_delta + merchant_delta, -fee);
    }
}
