//! HTTP handlers

pub mod leaderboard;
pub mod pay;
