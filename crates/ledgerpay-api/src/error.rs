//! API error handling
//!
//! User-visible [`PayError`] kinds map to 4xx statuses; everything else is
//! logged and collapses to a generic 500 so infrastructure details never
//! leak to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use ledgerpay_core::PayError;
use ledgerpay_db::DbError;
use ledgerpay_settlement::EngineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Pay(PayError),
    /// Malformed request parameters (edge validation, not a core error)
    Invalid(String),
    Internal,
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn pay_status(err: PayError) -> StatusCode {
    match err {
        PayError::InsufficientBalance
        | PayError::DailyLimitExceeded
        | PayError::OrderNoFormatError => StatusCode::BAD_REQUEST,
        PayError::Unauthorized => StatusCode::UNAUTHORIZED,
        PayError::CannotPaySelf
        | PayError::TestModeCannotProcessOrder
        | PayError::OrderAlreadySettled => StatusCode::FORBIDDEN,
        PayError::OrderNotFound
        | PayError::MerchantInfoNotFound
        | PayError::PayConfigNotFound => StatusCode::NOT_FOUND,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Pay(err) => (
                pay_status(err),
                ErrorBody {
                    code: err.error_code(),
                    message: err.to_string(),
                },
            ),
            Self::Invalid(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_REQUEST",
                    message,
                },
            ),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "INTERNAL_ERROR",
                    message: "internal server error".to_string(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<PayError> for ApiError {
    fn from(err: PayError) -> Self {
        Self::Pay(err)
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err.as_pay_error() {
            Some(pay) => Self::Pay(pay),
            None => {
                error!(error = %err, "settlement engine failure");
                Self::Internal
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        error!(error = %err, "database failure");
        Self::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(pay_status(PayError::InsufficientBalance), StatusCode::BAD_REQUEST);
        assert_eq!(pay_status(PayError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(pay_status(PayError::CannotPaySelf), StatusCode::FORBIDDEN);
        assert_eq!(pay_status(PayError::OrderNotFound), StatusCode::NOT_FOUND);
    }
}
