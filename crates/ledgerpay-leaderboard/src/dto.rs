//! Leaderboard request/response types
//!
//! Responses are serialised into the Redis cache as-is, so everything here
//! derives both `Serialize` and `Deserialize`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpay_core::{MetricType, PeriodType, TrendType};

use crate::period::LeaderboardPeriod;

/// Top-N snapshots keep at most this many rows.
pub const MAX_RANKINGS: u32 = 100;

/// Default list page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Query parameters of the list and rank endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListRequest {
    #[serde(default = "default_period")]
    pub period: PeriodType,
    #[serde(default = "default_metric")]
    pub metric: MetricType,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_period() -> PeriodType {
    PeriodType::Week
}

fn default_metric() -> MetricType {
    MetricType::VolumeAmount
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            period: default_period(),
            metric: default_metric(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl ListRequest {
    /// Clamp pagination into the supported range.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_RANKINGS);
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

/// The resolved window echoed back in responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodInfo {
    #[serde(rename = "type")]
    pub period_type: PeriodType,
    pub start: String,
    pub end: String,
}

impl From<&LeaderboardPeriod> for PeriodInfo {
    fn from(period: &LeaderboardPeriod) -> Self {
        Self {
            period_type: period.period_type,
            start: period.start_string(),
            end: period.end_string(),
        }
    }
}

/// One ranked user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: i64,
    pub username: String,
    pub avatar_url: String,
    pub score: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_rank: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendType>,
}

/// Paginated leaderboard list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub period: PeriodInfo,
    pub metric: MetricType,
    /// When the underlying data was materialised (RFC 3339); the current
    /// instant on the realtime path
    pub snapshot_at: String,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub items: Vec<LeaderboardEntry>,
}

/// A single user's standing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRankInfo {
    pub user_id: i64,
    pub rank: i64,
    pub score: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_rank: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRankResponse {
    pub period: PeriodInfo,
    pub metric: MetricType,
    pub snapshot_at: String,
    pub user: UserRankInfo,
}

/// Metadata for clients: available periods/metrics and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub periods: Vec<PeriodType>,
    pub metrics: Vec<MetricInfo>,
    pub timezone: String,
    pub defaults: MetadataDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricInfo {
    pub key: MetricType,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDefaults {
    pub period: PeriodType,
    pub metric: MetricType,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req: ListRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.period, PeriodType::Week);
        assert_eq!(req.metric, MetricType::VolumeAmount);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_normalization() {
        let req = ListRequest {
            page: 0,
            page_size: 500,
            ..Default::default()
        }
        .normalized();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, MAX_RANKINGS);
        assert_eq!(req.offset(), 0);

        let deep = ListRequest {
            page: 3,
            page_size: 20,
            ..Default::default()
        }
        .normalized();
        assert_eq!(deep.offset(), 40);
    }

    #[test]
    fn test_entry_omits_absent_trend() {
        let entry = LeaderboardEntry {
            rank: 1,
            user_id: 5,
            username: "u".into(),
            avatar_url: String::new(),
            score: Decimal::from(10),
            previous_rank: None,
            trend: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("previous_rank"));
        assert!(!json.contains("trend"));
    }
}
