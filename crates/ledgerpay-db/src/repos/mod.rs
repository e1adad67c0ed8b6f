//! Repositories, one per domain area
//!
//! Repositories own pool-scoped reads and writes. Multi-row transactional
//! updates (settlement, refund) live in the settlement engine, which opens
//! its own transaction and uses the module-level helpers exported here that
//! operate on a borrowed connection.

mod leaderboard;
mod merchant_key;
mod order;
mod pay_tier;
mod ranking;
mod scores;
mod user;

pub use leaderboard::{LeaderboardRepo, RealtimeEntry};
pub use merchant_key::MerchantKeyRepo;
pub use order::{
    lock_by_id, lock_success_nowait, mark_refund, mark_success, today_used, OrderRepo,
};
pub use pay_tier::{tier_for_score, PayTierRepo};
pub use ranking::RankingRepo;
pub use scores::{ScoreRepo, MAX_ROWS_PER_BATCH};
pub use user::UserRepo;
