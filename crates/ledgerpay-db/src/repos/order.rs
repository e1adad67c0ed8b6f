//! Order repository and transactional lock helpers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{DbResult, NewOrder, Order, UserMetricsRow};

pub struct OrderRepo {
    pool: PgPool,
}

impl OrderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a fresh pending order.
    pub async fn create(&self, order: &NewOrder) -> DbResult<Order> {
        let row = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (type, status, payer_user_id, payee_user_id, name, amount, fee, merchant_order_no)
            VALUES ($1, 'pending', 0, $2, $3, $4, 0, $5)
            RETURNING *
            "#,
        )
        .bind(order.order_type.as_str())
        .bind(order.payee_user_id)
        .bind(&order.name)
        .bind(order.amount)
        .bind(&order.merchant_order_no)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// Merchant order numbers are unique per merchant; used for idempotent
    /// order creation at the integration edge.
    pub async fn find_by_merchant_order_no(
        &self,
        payee_user_id: i64,
        merchant_order_no: &str,
    ) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE payee_user_id = $1 AND merchant_order_no = $2",
        )
        .bind(payee_user_id)
        .bind(merchant_order_no)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    /// Pivot successful orders in `[start, end)` into per-user metric sums.
    ///
    /// Payer and payee sides are aggregated separately then merged, so a
    /// user active on both sides gets one row. Rows keyed by the 0
    /// placeholder id (pending orders never settled) are excluded.
    pub async fn aggregate_user_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<UserMetricsRow>> {
        let rows = sqlx::query_as::<_, UserMetricsRow>(
            r#"
            WITH base AS (
                SELECT payer_user_id, payee_user_id, amount, type
                FROM orders
                WHERE status = 'success' AND created_at >= $1 AND created_at < $2
            ),
            payee AS (
                SELECT
                    payee_user_id AS user_id,
                    SUM(amount) AS receive_amount,
                    0::numeric AS payment_amount,
                    SUM(CASE WHEN type = 'transfer' THEN amount ELSE 0::numeric END) AS transfer_in_amount,
                    0::numeric AS transfer_out_amount,
                    SUM(amount) AS volume_amount
                FROM base
                WHERE payee_user_id <> 0
                GROUP BY payee_user_id
            ),
            payer AS (
                SELECT
                    payer_user_id AS user_id,
                    0::numeric AS receive_amount,
                    SUM(amount) AS payment_amount,
                    0::numeric AS transfer_in_amount,
                    SUM(CASE WHEN type = 'transfer' THEN amount ELSE 0::numeric END) AS transfer_out_amount,
                    SUM(amount) AS volume_amount
                FROM base
                WHERE payer_user_id <> 0
                GROUP BY payer_user_id
            )
            SELECT
                user_id,
                SUM(receive_amount) AS receive_amount,
                SUM(payment_amount) AS payment_amount,
                SUM(transfer_in_amount) AS transfer_in_amount,
                SUM(transfer_out_amount) AS transfer_out_amount,
                SUM(volume_amount) AS volume_amount
            FROM (
                SELECT * FROM payee
                UNION ALL
                SELECT * FROM payer
            ) sides
            GROUP BY user_id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Transactional helpers (borrowed connection)
// ============================================================================

/// Row-lock an order regardless of status. The caller inspects the status
/// to distinguish "not found" from "already settled".
pub async fn lock_by_id(conn: &mut PgConnection, id: i64) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Row-lock a successful order without waiting.
///
/// A concurrent settlement or refund holding the row makes this fail fast
/// with SQLSTATE 55P03 (`lock_not_available`); the refund engine treats
/// that as an idempotent no-op.
pub async fn lock_success_nowait(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND status = 'success' FOR UPDATE NOWAIT",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Amount already spent today on daily-limited order types.
pub async fn today_used(
    conn: &mut PgConnection,
    payer_user_id: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Decimal, sqlx::Error> {
    let (total,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM orders
        WHERE payer_user_id = $1
          AND status = 'success'
          AND type IN ('payment', 'online')
          AND trade_time >= $2 AND trade_time < $3
        "#,
    )
    .bind(payer_user_id)
    .bind(start)
    .bind(end)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// Finalize a settled order under its row lock.
pub async fn mark_success(
    conn: &mut PgConnection,
    id: i64,
    payer_user_id: i64,
    fee: Decimal,
    trade_time: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET status = 'success', payer_user_id = $2, fee = $3, trade_time = $4 WHERE id = $1",
    )
    .bind(id)
    .bind(payer_user_id)
    .bind(fee)
    .bind(trade_time)
    .execute(conn)
    .await?;
    Ok(())
}

/// Mark a refunded order under its row lock.
pub async fn mark_refund(conn: &mut PgConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET status = 'refund' WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
