//! Ranking snapshots with trend tracking
//!
//! Every run materialises a Top-100 per `(period, metric)` combination
//! (24 in total) against the previous snapshot of the same series, then
//! warms the page-1 list cache so cheap reads never touch the aggregate
//! table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info};

use ledgerpay_core::{MetricType, PeriodType, TrendType};
use ledgerpay_db::cache::ttl;
use ledgerpay_db::{cache::keys, Database, DbResult, RankingInsert};

use crate::dto::{LeaderboardEntry, ListResponse, PeriodInfo, DEFAULT_PAGE_SIZE, MAX_RANKINGS};
use crate::period::LeaderboardPeriod;

/// Materialise snapshots for all period/metric combinations.
///
/// Combinations fail independently; one bad series does not stop the run.
pub async fn run_snapshots(db: &Database) -> DbResult<()> {
    let snapshot_at = Utc::now();

    for period_type in PeriodType::ALL {
        let period = LeaderboardPeriod::at(period_type, snapshot_at);
        for metric in MetricType::ALL {
            if let Err(err) = snapshot_one(db, &period, metric, snapshot_at).await {
                error!(
                    period = %period_type,
                    metric = %metric,
                    error = %err,
                    "snapshot failed"
                );
            }
        }
    }
    Ok(())
}

async fn snapshot_one(
    db: &Database,
    period: &LeaderboardPeriod,
    metric: MetricType,
    snapshot_at: DateTime<Utc>,
) -> DbResult<()> {
    let top = db
        .score_repo()
        .list_top(
            period.period_type,
            period.start_date(),
            metric,
            MAX_RANKINGS as i64,
            0,
        )
        .await?;
    if top.is_empty() {
        return Ok(());
    }

    let previous = previous_ranks(db, period, metric).await?;
    let rows = build_snapshot_rows(period, metric, snapshot_at, &top, &previous);
    db.ranking_repo().insert(&rows).await?;

    info!(
        period = %period.period_type,
        metric = %metric,
        entries = rows.len(),
        "leaderboard snapshot written"
    );

    if let Err(err) = warm_list_cache(db, period, metric, snapshot_at, &rows).await {
        error!(period = %period.period_type, metric = %metric, error = %err, "cache warm failed");
    }
    Ok(())
}

/// `user_id → rank` of the most recent prior snapshot in the series.
async fn previous_ranks(
    db: &Database,
    period: &LeaderboardPeriod,
    metric: MetricType,
) -> DbResult<HashMap<i64, i32>> {
    let repo = db.ranking_repo();
    let Some(prior_at) = repo
        .latest_snapshot_at(period.period_type, period.start_date(), metric)
        .await?
    else {
        return Ok(HashMap::new());
    };

    let rows = repo
        .rows_at(
            period.period_type,
            period.start_date(),
            metric,
            prior_at,
            MAX_RANKINGS as i32,
        )
        .await?;
    Ok(rows.into_iter().map(|r| (r.user_id, r.rank)).collect())
}

/// Rank the top scores and derive each entry's trend against the previous
/// snapshot. `top` must already be ordered best-first.
pub fn build_snapshot_rows(
    period: &LeaderboardPeriod,
    metric: MetricType,
    snapshot_at: DateTime<Utc>,
    top: &[(i64, Decimal)],
    previous: &HashMap<i64, i32>,
) -> Vec<RankingInsert> {
    top.iter()
        .enumerate()
        .map(|(i, &(user_id, score))| {
            let rank = i as i32 + 1;
            let previous_rank = previous.get(&user_id).copied();
            let trend = previous_rank.map(|prev| match rank.cmp(&prev) {
                std::cmp::Ordering::Less => TrendType::Up,
                std::cmp::Ordering::Greater => TrendType::Down,
                std::cmp::Ordering::Equal => TrendType::Same,
            });
            RankingInsert {
                period_type: period.period_type,
                period_start: period.start_date(),
                period_end: period.end.date_naive(),
                metric,
                snapshot_at,
                rank,
                user_id,
                score,
                previous_rank,
                trend,
            }
        })
        .collect()
}

/// Pre-compute the default page-1 list response from the fresh snapshot.
async fn warm_list_cache(
    db: &Database,
    period: &LeaderboardPeriod,
    metric: MetricType,
    snapshot_at: DateTime<Utc>,
    rows: &[RankingInsert],
) -> DbResult<()> {
    let page_rows = &rows[..rows.len().min(DEFAULT_PAGE_SIZE as usize)];

    let ids: Vec<i64> = page_rows.iter().map(|r| r.user_id).collect();
    let briefs: HashMap<i64, _> = db
        .user_repo()
        .find_briefs(&ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    let items: Vec<LeaderboardEntry> = page_rows
        .iter()
        .map(|r| {
            let brief = briefs.get(&r.user_id);
            LeaderboardEntry {
                rank: r.rank as u32,
                user_id: r.user_id,
                username: brief.map(|b| b.username.clone()).unwrap_or_default(),
                avatar_url: brief.map(|b| b.avatar_url.clone()).unwrap_or_default(),
                score: r.score,
                previous_rank: r.previous_rank,
                trend: r.trend,
            }
        })
        .collect();

    let response = ListResponse {
        period: PeriodInfo::from(period),
        metric,
        snapshot_at: snapshot_at.to_rfc3339(),
        page: 1,
        page_size: DEFAULT_PAGE_SIZE,
        total: items.len() as i64,
        items,
    };

    let key = keys::leaderboard_list(
        period.period_type.as_str(),
        metric.as_str(),
        &period.start_compact(),
        1,
        DEFAULT_PAGE_SIZE,
    );
    db.cache().set(&key, &response, ttl::LEADERBOARD_LIST).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn week_period() -> LeaderboardPeriod {
        LeaderboardPeriod::at(
            PeriodType::Week,
            Utc.with_ymd_and_hms(2026, 7, 30, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_first_snapshot_has_no_trend() {
        let rows = build_snapshot_rows(
            &week_period(),
            MetricType::VolumeAmount,
            Utc::now(),
            &[(1, dec!(300)), (2, dec!(200))],
            &HashMap::new(),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
        assert!(rows.iter().all(|r| r.trend.is_none() && r.previous_rank.is_none()));
    }

    #[test]
    fn test_trend_against_previous_snapshot() {
        // snapshot A ranked [u1, u2, u3]; snapshot B ranks [u2, u1, u3]
        let previous = HashMap::from([(1, 1), (2, 2), (3, 3)]);
        let rows = build_snapshot_rows(
            &week_period(),
            MetricType::VolumeAmount,
            Utc::now(),
            &[(2, dec!(500)), (1, dec!(400)), (3, dec!(100))],
            &previous,
        );

        assert_eq!(rows[0].user_id, 2);
        assert_eq!(rows[0].previous_rank, Some(2));
        assert_eq!(rows[0].trend, Some(TrendType::Up));

        assert_eq!(rows[1].user_id, 1);
        assert_eq!(rows[1].previous_rank, Some(1));
        assert_eq!(rows[1].trend, Some(TrendType::Down));

        assert_eq!(rows[2].user_id, 3);
        assert_eq!(rows[2].previous_rank, Some(3));
        assert_eq!(rows[2].trend, Some(TrendType::Same));
    }

    #[test]
    fn test_ranks_are_contiguous_and_scores_non_increasing() {
        let top: Vec<(i64, Decimal)> = (0..150)
            .map(|i| (i as i64 + 1, Decimal::from(1000 - i)))
            .take(100)
            .collect();
        let rows = build_snapshot_rows(
            &week_period(),
            MetricType::NetAmount,
            Utc::now(),
            &top,
            &HashMap::new(),
        );

        assert_eq!(rows.len(), 100);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.rank, i as i32 + 1);
            if i > 0 {
                assert!(row.score <= rows[i - 1].score);
            }
        }
    }
}
