//! Leaderboard read handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use ledgerpay_core::{MetricType, PeriodType};
use ledgerpay_leaderboard::{ListRequest, ListResponse, MetadataResponse, UserRankResponse};

use crate::extractors::AuthenticatedUser;
use crate::{ApiResult, AppState};

/// Query parameters of the rank endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RankQuery {
    #[serde(default = "default_period")]
    pub period: PeriodType,
    #[serde(default = "default_metric")]
    pub metric: MetricType,
}

fn default_period() -> PeriodType {
    PeriodType::Week
}

fn default_metric() -> MetricType {
    MetricType::VolumeAmount
}

/// Paginated leaderboard list.
#[utoipa::path(
    get,
    path = "/api/leaderboard",
    tag = "Leaderboard",
    params(
        ("period" = Option<String>, Query, description = "day | week | month | all_time (default week)"),
        ("metric" = Option<String>, Query, description = "ranking metric (default volume_amount)"),
        ("page" = Option<u32>, Query, description = "1-based page (default 1)"),
        ("page_size" = Option<u32>, Query, description = "1..=100 (default 20)")
    ),
    responses((status = 200, description = "Ranked list"))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(request): Query<ListRequest>,
) -> ApiResult<Json<ListResponse>> {
    let response = state.leaderboard.get_list(request).await?;
    Ok(Json(response))
}

/// The authenticated user's rank.
#[utoipa::path(
    get,
    path = "/api/leaderboard/me",
    tag = "Leaderboard",
    params(
        ("period" = Option<String>, Query, description = "day | week | month | all_time"),
        ("metric" = Option<String>, Query, description = "ranking metric")
    ),
    responses(
        (status = 200, description = "Caller's rank"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn my_rank(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<RankQuery>,
) -> ApiResult<Json<UserRankResponse>> {
    let response = state
        .leaderboard
        .get_user_rank(user.id, query.period, query.metric)
        .await?;
    Ok(Json(response))
}

/// Any user's rank by id.
#[utoipa::path(
    get,
    path = "/api/leaderboard/users/{user_id}",
    tag = "Leaderboard",
    params(
        ("user_id" = i64, Path, description = "User id"),
        ("period" = Option<String>, Query, description = "day | week | month | all_time"),
        ("metric" = Option<String>, Query, description = "ranking metric")
    ),
    responses((status = 200, description = "User's rank"))
)]
pub async fn user_rank(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<RankQuery>,
) -> ApiResult<Json<UserRankResponse>> {
    let response = state
        .leaderboard
        .get_user_rank(user_id, query.period, query.metric)
        .await?;
    Ok(Json(response))
}

/// Available periods, metrics, and defaults.
#[utoipa::path(
    get,
    path = "/api/leaderboard/metadata",
    tag = "Leaderboard",
    responses((status = 200, description = "Leaderboard metadata"))
)]
pub async fn metadata(State(state): State<Arc<AppState>>) -> Json<MetadataResponse> {
    Json(state.leaderboard.metadata())
}
