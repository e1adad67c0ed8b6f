//! Row models mapped from PostgreSQL tables

use chrono::{DateTime, NaiveDate, Utc};
use ledgerpay_core::{MetricType, OrderStatus, OrderType, PeriodType, TrendType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Users & pay tiers
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub avatar_url: String,
    pub available_balance: Decimal,
    pub total_receive: Decimal,
    pub total_payment: Decimal,
    pub total_transfer: Decimal,
    pub pay_score: i64,
    pub is_active: bool,
    pub is_admin: bool,
    /// 32 random bytes, hex-encoded; the per-user AES-256-GCM key
    pub sign_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal user projection for leaderboard responses.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserBrief {
    pub id: i64,
    pub username: String,
    pub avatar_url: String,
}

/// One reputation-score band: fee rate, score rate, optional daily limit.
///
/// Tiers partition the score line; for any score exactly one row satisfies
/// `min_score <= score < max_score` (null `max_score` is open-ended).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PayTier {
    pub id: i64,
    pub level: i16,
    pub min_score: i64,
    pub max_score: Option<i64>,
    pub daily_limit: Option<i64>,
    pub fee_rate: Decimal,
    pub score_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayTier {
    /// Daily limit as a positive amount, if the tier has one.
    pub fn effective_daily_limit(&self) -> Option<i64> {
        self.daily_limit.filter(|limit| *limit > 0)
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[sqlx(rename = "type", try_from = "String")]
    pub order_type: OrderType,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    /// 0 until a payer settles the order
    pub payer_user_id: i64,
    pub payee_user_id: i64,
    /// Merchant-supplied display name, echoed in the callback
    pub name: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub merchant_order_no: String,
    pub trade_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a fresh pending order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_type: OrderType,
    pub payee_user_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub merchant_order_no: String,
}

// ============================================================================
// Merchant API keys
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MerchantApiKey {
    pub id: i64,
    pub client_id: String,
    pub client_secret: String,
    pub user_id: i64,
    pub notify_url: String,
    pub redirect_url: String,
    pub test_mode: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Leaderboard aggregates & snapshots
// ============================================================================

/// One row of the per-user metric pivot over a period's orders.
#[derive(Debug, Clone, FromRow)]
pub struct UserMetricsRow {
    pub user_id: i64,
    pub receive_amount: Decimal,
    pub payment_amount: Decimal,
    pub transfer_in_amount: Decimal,
    pub transfer_out_amount: Decimal,
    pub volume_amount: Decimal,
}

/// One aggregate score destined for `leaderboard_scores`.
#[derive(Debug, Clone)]
pub struct ScoreInsert {
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub metric_type: MetricType,
    pub user_id: i64,
    pub score: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// One materialised Top-N snapshot row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeaderboardRanking {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[sqlx(try_from = "String")]
    pub metric: MetricType,
    pub snapshot_at: DateTime<Utc>,
    pub rank: i32,
    pub user_id: i64,
    pub score: Decimal,
    pub previous_rank: Option<i32>,
    trend: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LeaderboardRanking {
    /// Rank movement versus the previous snapshot, if one existed.
    pub fn trend(&self) -> Option<TrendType> {
        self.trend.as_deref().and_then(|t| t.parse().ok())
    }
}

/// Snapshot row being written by the snapshot job.
#[derive(Debug, Clone)]
pub struct RankingInsert {
    pub period_type: PeriodType,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub metric: MetricType,
    pub snapshot_at: DateTime<Utc>,
    pub rank: i32,
    pub user_id: i64,
    pub score: Decimal,
    pub previous_rank: Option<i32>,
    pub trend: Option<TrendType>,
}
