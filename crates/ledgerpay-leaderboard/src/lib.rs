//! LedgerPay leaderboard engine
//!
//! Three cooperating pieces:
//!
//! - [`aggregate`]: the scheduled job that pivots settled orders into
//!   per-user per-metric scores and batch-appends them to the analytics
//!   table
//! - [`snapshot`]: the scheduled job that materialises Top-100 rankings
//!   with trend tracking against the previous snapshot, and warms the
//!   page-1 cache
//! - [`LeaderboardService`]: the read path: response cache, then a fresh
//!   snapshot (page 1 only), then the realtime aggregate query
//!
//! All period arithmetic is local-time (Asia/Shanghai); see
//! [`period::LeaderboardPeriod`].

pub mod aggregate;
pub mod dto;
pub mod period;
pub mod service;
pub mod snapshot;
pub mod worker;

pub use dto::{
    LeaderboardEntry, ListRequest, ListResponse, MetadataResponse, PeriodInfo, UserRankResponse,
    DEFAULT_PAGE_SIZE, MAX_RANKINGS,
};
pub use period::LeaderboardPeriod;
pub use service::LeaderboardService;
