//! LedgerPay core domain layer
//!
//! Shared building blocks for the payment platform:
//!
//! - **Money**: fixed-point decimal arithmetic with banker's rounding
//! - **Order tokens**: per-merchant AES-256-GCM encryption of order ids
//! - **Callback signing**: EPay-convention MD5 signatures for merchant
//!   notifications, plus Ed25519 verification for the OAuth edge
//! - **Domain enums**: order status state machine, order/period/metric/trend
//!   types shared by the settlement and leaderboard engines
//!
//! This crate is persistence-free; the database layer binds these types at
//! the storage boundary.

pub mod crypto;
pub mod error;
pub mod money;
pub mod sign;
pub mod time;
pub mod types;

pub use error::{PayError, PayResult};
pub use types::{MetricType, OrderStatus, OrderType, PeriodType, TrendType};
