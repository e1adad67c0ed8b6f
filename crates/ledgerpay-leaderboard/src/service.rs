//! Leaderboard read service
//!
//! Read tiers, cheapest first:
//!
//! 1. the Redis response cache (TTL-bounded staleness, no invalidation)
//! 2. the latest snapshot, if fresher than 15 minutes (page 1 with
//!    `page_size <= 100` only)
//! 3. the realtime aggregate query over orders
//!
//! Deep pages and oversized page sizes always take the realtime path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use ledgerpay_core::time::LOCAL_TZ_NAME;
use ledgerpay_core::{MetricType, PeriodType};
use ledgerpay_db::cache::{keys, ttl};
use ledgerpay_db::{Database, DbResult, LeaderboardRanking, UserBrief};

use crate::dto::{
    LeaderboardEntry, ListRequest, ListResponse, MetadataDefaults, MetadataResponse, MetricInfo,
    PeriodInfo, UserRankInfo, UserRankResponse, DEFAULT_PAGE_SIZE, MAX_RANKINGS,
};
use crate::period::LeaderboardPeriod;

/// Snapshots older than this fall through to the realtime path.
const SNAPSHOT_FRESHNESS_MINUTES: i64 = 15;

fn snapshot_is_fresh(snapshot_at: DateTime<Utc>) -> bool {
    Utc::now() - snapshot_at <= Duration::minutes(SNAPSHOT_FRESHNESS_MINUTES)
}

pub struct LeaderboardService {
    db: Arc<Database>,
}

impl LeaderboardService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Paginated leaderboard list.
    pub async fn get_list(&self, request: ListRequest) -> DbResult<ListResponse> {
        let request = request.normalized();
        let period = LeaderboardPeriod::current(request.period);

        let cache_key = keys::leaderboard_list(
            request.period.as_str(),
            request.metric.as_str(),
            &period.start_compact(),
            request.page,
            request.page_size,
        );
        if let Some(cached) = self.db.cache().get::<ListResponse>(&cache_key).await? {
            debug!(key = %cache_key, "leaderboard list cache hit");
            return Ok(cached);
        }

        if request.page == 1 && request.page_size <= MAX_RANKINGS {
            if let Some(response) = self.list_from_snapshot(&request, &period).await? {
                self.db
                    .cache()
                    .set(&cache_key, &response, ttl::LEADERBOARD_LIST)
                    .await?;
                return Ok(response);
            }
        }

        let response = self.list_realtime(&request, &period).await?;
        self.db
            .cache()
            .set(&cache_key, &response, ttl::LEADERBOARD_LIST)
            .await?;
        Ok(response)
    }

    /// A user's rank for one `(period, metric)`.
    pub async fn get_user_rank(
        &self,
        user_id: i64,
        period_type: PeriodType,
        metric: MetricType,
    ) -> DbResult<UserRankResponse> {
        let period = LeaderboardPeriod::current(period_type);

        if let Some(response) = self
            .user_rank_from_snapshot(user_id, &period, metric)
            .await?
        {
            return Ok(response);
        }

        let repo = self.db.leaderboard_repo();
        let (start, end) = (period.start_utc(), period.end_utc());
        let score = repo.user_score(metric, start, end, user_id).await?;
        let rank = repo.user_rank(metric, start, end, score, user_id).await?;

        Ok(UserRankResponse {
            period: PeriodInfo::from(&period),
            metric,
            snapshot_at: Utc::now().to_rfc3339(),
            user: UserRankInfo {
                user_id,
                rank,
                score,
                previous_rank: None,
                trend: None,
            },
        })
    }

    /// Available periods, metrics, and defaults.
    pub fn metadata(&self) -> MetadataResponse {
        MetadataResponse {
            periods: PeriodType::ALL.to_vec(),
            metrics: MetricType::ALL
                .iter()
                .map(|m| MetricInfo {
                    key: *m,
                    name: m.display_name().to_string(),
                })
                .collect(),
            timezone: LOCAL_TZ_NAME.to_string(),
            defaults: MetadataDefaults {
                period: PeriodType::Week,
                metric: MetricType::VolumeAmount,
                page_size: DEFAULT_PAGE_SIZE,
            },
        }
    }

    // =========================================================================
    // Snapshot path
    // =========================================================================

    async fn latest_fresh_snapshot(
        &self,
        period: &LeaderboardPeriod,
        metric: MetricType,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let snapshot_at = self
            .db
            .ranking_repo()
            .latest_snapshot_at(period.period_type, period.start_date(), metric)
            .await?;
        Ok(snapshot_at.filter(|at| snapshot_is_fresh(*at)))
    }

    async fn list_from_snapshot(
        &self,
        request: &ListRequest,
        period: &LeaderboardPeriod,
    ) -> DbResult<Option<ListResponse>> {
        let Some(snapshot_at) = self.latest_fresh_snapshot(period, request.metric).await? else {
            return Ok(None);
        };

        let rows = self
            .db
            .ranking_repo()
            .rows_at(
                period.period_type,
                period.start_date(),
                request.metric,
                snapshot_at,
                request.page_size as i32,
            )
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let briefs = self.briefs_for(rows.iter().map(|r| r.user_id)).await?;
        let items: Vec<LeaderboardEntry> = rows
            .iter()
            .map(|r| entry_from_ranking(r, &briefs))
            .collect();

        Ok(Some(ListResponse {
            period: PeriodInfo::from(period),
            metric: request.metric,
            snapshot_at: snapshot_at.to_rfc3339(),
            page: 1,
            page_size: request.page_size,
            total: items.len() as i64,
            items,
        }))
    }

    async fn user_rank_from_snapshot(
        &self,
        user_id: i64,
        period: &LeaderboardPeriod,
        metric: MetricType,
    ) -> DbResult<Option<UserRankResponse>> {
        let Some(snapshot_at) = self.latest_fresh_snapshot(period, metric).await? else {
            return Ok(None);
        };

        let Some(row) = self
            .db
            .ranking_repo()
            .user_row_at(
                period.period_type,
                period.start_date(),
                metric,
                snapshot_at,
                user_id,
            )
            .await?
        else {
            // outside the Top-100; the realtime path answers instead
            return Ok(None);
        };

        Ok(Some(UserRankResponse {
            period: PeriodInfo::from(period),
            metric,
            snapshot_at: snapshot_at.to_rfc3339(),
            user: UserRankInfo {
                user_id,
                rank: row.rank as i64,
                score: row.score,
                previous_rank: row.previous_rank,
                trend: row.trend(),
            },
        }))
    }

    // =========================================================================
    // Realtime path
    // =========================================================================

    async fn list_realtime(
        &self,
        request: &ListRequest,
        period: &LeaderboardPeriod,
    ) -> DbResult<ListResponse> {
        let repo = self.db.leaderboard_repo();
        let (start, end) = (period.start_utc(), period.end_utc());

        let total = repo.count(request.metric, start, end).await?;
        let entries = repo
            .list(
                request.metric,
                start,
                end,
                request.page_size as i64,
                request.offset(),
            )
            .await?;

        let items: Vec<LeaderboardEntry> = entries
            .into_iter()
            .enumerate()
            .map(|(i, e)| LeaderboardEntry {
                rank: request.offset() as u32 + i as u32 + 1,
                user_id: e.user_id,
                username: e.username,
                avatar_url: e.avatar_url,
                score: e.score,
                previous_rank: None,
                trend: None,
            })
            .collect();

        Ok(ListResponse {
            period: PeriodInfo::from(period),
            metric: request.metric,
            snapshot_at: Utc::now().to_rfc3339(),
            page: request.page,
            page_size: request.page_size,
            total,
            items,
        })
    }

    async fn briefs_for(
        &self,
        ids: impl Iterator<Item = i64>,
    ) -> DbResult<HashMap<i64, UserBrief>> {
        let ids: Vec<i64> = ids.collect();
        let briefs = self.db.user_repo().find_briefs(&ids).await?;
        Ok(briefs.into_iter().map(|b| (b.id, b)).collect())
    }
}

fn entry_from_ranking(
    row: &LeaderboardRanking,
    briefs: &HashMap<i64, UserBrief>,
) -> LeaderboardEntry {
    let brief = briefs.get(&row.user_id);
    LeaderboardEntry {
        rank: row.rank as u32,
        user_id: row.user_id,
        username: brief.map(|b| b.username.clone()).unwrap_or_default(),
        avatar_url: brief.map(|b| b.avatar_url.clone()).unwrap_or_default(),
        score: row.score,
        previous_rank: row.previous_rank,
        trend: row.trend(),
    }
}
