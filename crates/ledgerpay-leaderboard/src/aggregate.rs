//! Scheduled aggregation of orders into leaderboard scores
//!
//! For each period type the job runs one pivot query over successful orders
//! and appends every non-zero `(user, metric)` score to the analytics
//! table with a shared `updated_at`. The job is idempotent: re-running it
//! for an unchanged period appends rows that resolve to identical
//! latest-write-wins scores.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;

use ledgerpay_core::{MetricType, PeriodType};
use ledgerpay_db::{Database, DbResult, ScoreInsert, UserMetricsRow};

use crate::period::LeaderboardPeriod;

/// Sync aggregate scores for the given period types (all four when empty).
pub async fn sync_scores(db: &Database, period_types: &[PeriodType]) -> DbResult<u64> {
    let period_types = if period_types.is_empty() {
        &PeriodType::ALL[..]
    } else {
        period_types
    };

    let mut total_rows = 0u64;
    for &period_type in period_types {
        let period = LeaderboardPeriod::current(period_type);
        total_rows += sync_period(db, &period).await?;
    }
    Ok(total_rows)
}

async fn sync_period(db: &Database, period: &LeaderboardPeriod) -> DbResult<u64> {
    info!(
        period = %period.period_type,
        start = %period.start_string(),
        end = %period.end_string(),
        "aggregating leaderboard scores"
    );

    let metrics = db
        .order_repo()
        .aggregate_user_metrics(period.start_utc(), period.end_utc())
        .await?;

    let rows = score_rows(
        period.period_type,
        period.start_date(),
        Utc::now(),
        &metrics,
    );
    let inserted = db.score_repo().append(&rows).await?;

    info!(
        period = %period.period_type,
        period_start = %period.start_date(),
        users = metrics.len(),
        rows = inserted,
        "leaderboard aggregate sync complete"
    );
    Ok(inserted)
}

/// Expand pivot rows into per-metric score inserts, skipping zero scores
/// and the 0 placeholder user id.
pub fn score_rows(
    period_type: PeriodType,
    period_start: NaiveDate,
    updated_at: DateTime<Utc>,
    metrics: &[UserMetricsRow],
) -> Vec<ScoreInsert> {
    let mut rows = Vec::new();

    let mut push = |user_id: i64, metric_type: MetricType, score: Decimal| {
        if score.is_zero() {
            return;
        }
        rows.push(ScoreInsert {
            period_type,
            period_start,
            metric_type,
            user_id,
            score,
            updated_at,
        });
    };

    for m in metrics {
        if m.user_id == 0 {
            continue;
        }
        push(m.user_id, MetricType::ReceiveAmount, m.receive_amount);
        push(m.user_id, MetricType::PaymentAmount, m.payment_amount);
        push(m.user_id, MetricType::TransferInAmount, m.transfer_in_amount);
        push(m.user_id, MetricType::TransferOutAmount, m.transfer_out_amount);
        push(m.user_id, MetricType::VolumeAmount, m.volume_amount);
        push(
            m.user_id,
            MetricType::NetAmount,
            m.receive_amount - m.payment_amount,
        );
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(user_id: i64, receive: Decimal, payment: Decimal) -> UserMetricsRow {
        UserMetricsRow {
            user_id,
            receive_amount: receive,
            payment_amount: payment,
            transfer_in_amount: Decimal::ZERO,
            transfer_out_amount: Decimal::ZERO,
            volume_amount: receive + payment,
        }
    }

    #[test]
    fn test_zero_scores_skipped() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let metrics = vec![row(1, dec!(100), dec!(0))];
        let rows = score_rows(PeriodType::Week, date, Utc::now(), &metrics);

        // receive, volume, net; payment and both transfers are zero
        assert_eq!(rows.len(), 3);
        assert!(rows
            .iter()
            .all(|r| r.metric_type != MetricType::PaymentAmount));
    }

    #[test]
    fn test_net_can_be_negative() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let metrics = vec![row(1, dec!(10), dec!(40))];
        let rows = score_rows(PeriodType::Week, date, Utc::now(), &metrics);

        let net = rows
            .iter()
            .find(|r| r.metric_type == MetricType::NetAmount)
            .unwrap();
        assert_eq!(net.score, dec!(-30));
    }

    #[test]
    fn test_placeholder_user_excluded() {
        let date = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let metrics = vec![row(0, dec!(100), dec!(50)), row(2, dec!(5), dec!(0))];
        let rows = score_rows(PeriodType::Day, date, Utc::now(), &metrics);
        assert!(rows.iter().all(|r| r.user_id == 2));
    }
}
