//! Per-payer daily spending limit
//!
//! Concurrent payments by one payer within one local day serialise on a
//! session-scoped advisory lock, so the usage sum and the balance debit
//! observe a consistent view. Different payers (or different days) never
//! contend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::debug;

use ledgerpay_core::{time, PayError};
use ledgerpay_db::{repos, PayTier};

use crate::EngineError;

/// Advisory lock key for `(payer, local day)`: `user_id * 1e8 + yyyymmdd`.
pub fn advisory_lock_key(user_id: i64, now: DateTime<Utc>) -> i64 {
    user_id * 100_000_000 + time::local_date_number(now)
}

/// Enforce the payer tier's daily limit inside the settlement transaction.
///
/// Tiers without a positive `daily_limit` are unlimited. The advisory lock
/// is transaction-scoped (`pg_advisory_xact_lock`) and released on
/// commit/rollback.
pub(crate) async fn check_daily_limit(
    conn: &mut PgConnection,
    payer_id: i64,
    tier: &PayTier,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let Some(limit) = tier.effective_daily_limit() else {
        return Ok(());
    };

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(advisory_lock_key(payer_id, now))
        .execute(&mut *conn)
        .await?;

    let (start, end) = time::local_day_bounds(now);
    let used = repos::today_used(conn, payer_id, start, end).await?;

    debug!(payer_id, %used, %amount, limit, "daily limit check");

    if used + amount > Decimal::from(limit) {
        return Err(PayError::DailyLimitExceeded.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_lock_key_is_per_payer_per_day() {
        let aug1 = Utc.with_ymd_and_hms(2026, 8, 1, 3, 0, 0).unwrap();
        let aug1_later = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        // 16:05 UTC is already Aug 2 in Shanghai
        let aug2_local = Utc.with_ymd_and_hms(2026, 8, 1, 16, 5, 0).unwrap();

        assert_eq!(advisory_lock_key(42, aug1), 42 * 100_000_000 + 2026_08_01);
        assert_eq!(advisory_lock_key(42, aug1), advisory_lock_key(42, aug1_later));
        assert_ne!(advisory_lock_key(42, aug1), advisory_lock_key(42, aug2_local));
        assert_ne!(advisory_lock_key(42, aug1), advisory_lock_key(43, aug1));
    }
}
