//! LedgerPay HTTP surface
//!
//! Thin axum wrappers over the settlement engine and the leaderboard read
//! service. Session/OAuth authentication is an external concern: the edge
//! proxy injects the verified user id, which [`extractors::AuthenticatedUser`]
//! turns into a loaded user row.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
