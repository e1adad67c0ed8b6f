//! Router assembly

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{leaderboard, pay};
use crate::AppState;

/// Build the full API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/pay/orders", post(pay::create_order))
        .route("/api/pay/orders/:order_no", get(pay::order_info))
        .route("/api/pay/orders/:order_no/settle", post(pay::settle_order))
        .route("/api/pay/transfer", post(pay::transfer))
        .route("/api/leaderboard", get(leaderboard::list))
        .route("/api/leaderboard/me", get(leaderboard::my_rank))
        .route("/api/leaderboard/users/:user_id", get(leaderboard::user_rank))
        .route("/api/leaderboard/metadata", get(leaderboard::metadata))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
