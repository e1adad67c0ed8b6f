//! Application state shared across handlers

use std::sync::Arc;

use ledgerpay_db::Database;
use ledgerpay_leaderboard::LeaderboardService;

/// Shared application state
pub struct AppState {
    /// Database connection pools
    pub db: Arc<Database>,
    /// Leaderboard read service
    pub leaderboard: LeaderboardService,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        let leaderboard = LeaderboardService::new(db.clone());
        Self { db, leaderboard }
    }
}
