//! User-visible payment errors
//!
//! Every error a caller of the settlement or leaderboard surface can
//! observe. Infrastructure failures (database, cache, queue, HTTP) are not
//! represented here; they stay internal and roll back the surrounding
//! transaction.

use thiserror::Error;

/// Result type for payment operations
pub type PayResult<T> = Result<T, PayError>;

/// Errors surfaced to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayError {
    /// Payer balance is lower than the order amount
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The payment would push the payer past their tier's daily limit
    #[error("daily payment limit exceeded")]
    DailyLimitExceeded,

    /// Payer and merchant are the same user and the merchant is not in test mode
    #[error("cannot pay your own order")]
    CannotPaySelf,

    /// A test-mode merchant can only settle orders paid by itself
    #[error("test mode cannot process orders from other users")]
    TestModeCannotProcessOrder,

    /// No order behind the supplied token, or the order expired
    #[error("order not found")]
    OrderNotFound,

    /// The order has already left the pending state
    #[error("order already settled")]
    OrderAlreadySettled,

    /// Merchant account missing or disabled
    #[error("merchant info not found")]
    MerchantInfoNotFound,

    /// The order token failed to decrypt or parse
    #[error("order number format error")]
    OrderNoFormatError,

    /// No pay-tier row covers the user's score
    #[error("pay config not found")]
    PayConfigNotFound,

    /// Caller is not authenticated
    #[error("unauthorized")]
    Unauthorized,
}

impl PayError {
    /// Stable error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::DailyLimitExceeded => "DAILY_LIMIT_EXCEEDED",
            Self::CannotPaySelf => "CANNOT_PAY_SELF",
            Self::TestModeCannotProcessOrder => "TEST_MODE_CANNOT_PROCESS_ORDER",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::OrderAlreadySettled => "ORDER_ALREADY_SETTLED",
            Self::MerchantInfoNotFound => "MERCHANT_INFO_NOT_FOUND",
            Self::OrderNoFormatError => "ORDER_NO_FORMAT_ERROR",
            Self::PayConfigNotFound => "PAY_CONFIG_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PayError::InsufficientBalance.error_code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(PayError::OrderNotFound.error_code(), "ORDER_NOT_FOUND");
    }
}
