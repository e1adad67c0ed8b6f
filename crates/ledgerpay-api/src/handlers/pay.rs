//! Payment handlers
//!
//! The full checkout loop: a merchant creates a pending order through its
//! API key and hands the opaque `order_no` to the payer's browser, which
//! fetches the summary and confirms settlement. Transfers move money
//! directly between two authenticated users.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ledgerpay_core::{OrderStatus, OrderType, PayError};
use ledgerpay_db::NewOrder;
use ledgerpay_settlement::{create_merchant_order, resolve_order_token, settle};

use crate::extractors::{AuthenticatedUser, MerchantAuth};
use crate::{ApiError, ApiResult, AppState};

/// Order creation request from a merchant integration.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "type", default = "default_order_type")]
    pub order_type: OrderType,
    pub name: String,
    pub amount: Decimal,
    pub merchant_order_no: String,
}

fn default_order_type() -> OrderType {
    OrderType::Payment
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: i64,
    /// Opaque checkout token for the payer's browser
    pub order_no: String,
    pub amount: Decimal,
    pub status: OrderStatus,
}

/// Order summary shown on the checkout page.
#[derive(Debug, Serialize)]
pub struct OrderInfoResponse {
    pub order_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub merchant_username: String,
    pub status: OrderStatus,
}

/// Result of a confirmed settlement.
#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub order_id: i64,
    pub amount: Decimal,
    pub fee: Decimal,
    pub status: OrderStatus,
    pub trade_time: Option<DateTime<Utc>>,
}

/// Transfer request between two users.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_user_id: i64,
    pub amount: Decimal,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub order_id: i64,
    pub amount: Decimal,
    pub trade_time: Option<DateTime<Utc>>,
}

/// Amounts are positive scale-2 decimals everywhere on this surface.
fn validate_amount(amount: Decimal) -> Result<(), String> {
    if amount <= Decimal::ZERO {
        return Err("amount must be positive".to_string());
    }
    if amount.scale() > 2 {
        return Err("amount supports at most two fractional digits".to_string());
    }
    Ok(())
}

fn validate_create_order(request: &CreateOrderRequest) -> Result<(), String> {
    validate_amount(request.amount)?;
    if request.merchant_order_no.trim().is_empty() {
        return Err("merchant_order_no must not be empty".to_string());
    }
    if request.name.trim().is_empty() {
        return Err("name must not be empty".to_string());
    }
    Ok(())
}

/// Create a pending order for the authenticated merchant.
#[utoipa::path(
    post,
    path = "/api/pay/orders",
    tag = "Pay",
    responses(
        (status = 200, description = "Pending order with its checkout token"),
        (status = 400, description = "Invalid parameters"),
        (status = 401, description = "Unknown API key"),
        (status = 403, description = "Order number already settled")
    )
)]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    MerchantAuth { merchant, .. }: MerchantAuth,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<Json<CreateOrderResponse>> {
    validate_create_order(&request).map_err(ApiError::Invalid)?;

    let new_order = NewOrder {
        order_type: request.order_type,
        payee_user_id: merchant.id,
        name: request.name,
        amount: request.amount,
        merchant_order_no: request.merchant_order_no,
    };
    let (order, order_no) = create_merchant_order(&state.db, &merchant, &new_order).await?;

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        order_no,
        amount: order.amount,
        status: order.status,
    }))
}

/// Resolve an order token into its checkout summary.
#[utoipa::path(
    get,
    path = "/api/pay/orders/{order_no}",
    tag = "Pay",
    params(("order_no" = String, Path, description = "Opaque order token")),
    responses(
        (status = 200, description = "Order summary"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown or expired order token")
    )
)]
pub async fn order_info(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_no): Path<String>,
) -> ApiResult<Json<OrderInfoResponse>> {
    let ctx = resolve_order_token(&state.db, &user, &order_no).await?;

    let order = state
        .db
        .order_repo()
        .find_by_id(ctx.order_id)
        .await?
        .ok_or(ApiError::Pay(PayError::OrderNotFound))?;

    Ok(Json(OrderInfoResponse {
        order_id: order.id,
        name: order.name,
        amount: order.amount,
        merchant_username: ctx.merchant.username,
        status: order.status,
    }))
}

/// Settle a pending order as the authenticated payer.
#[utoipa::path(
    post,
    path = "/api/pay/orders/{order_no}/settle",
    tag = "Pay",
    params(("order_no" = String, Path, description = "Opaque order token")),
    responses(
        (status = 200, description = "Order settled"),
        (status = 400, description = "Insufficient balance or limit exceeded"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Policy violation or already settled"),
        (status = 404, description = "Unknown or expired order token")
    )
)]
pub async fn settle_order(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_no): Path<String>,
) -> ApiResult<Json<SettleResponse>> {
    let ctx = resolve_order_token(&state.db, &user, &order_no).await?;
    let settled = settle(&state.db, &ctx).await?;

    Ok(Json(SettleResponse {
        order_id: settled.order.id,
        amount: settled.order.amount,
        fee: settled.fee,
        status: settled.order.status,
        trade_time: settled.order.trade_time,
    }))
}

/// Transfer balance to another user.
#[utoipa::path(
    post,
    path = "/api/pay/transfer",
    tag = "Pay",
    responses(
        (status = 200, description = "Transfer completed"),
        (status = 400, description = "Invalid amount or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Cannot transfer to yourself")
    )
)]
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<TransferRequest>,
) -> ApiResult<Json<TransferResponse>> {
    validate_amount(request.amount).map_err(ApiError::Invalid)?;

    let order = ledgerpay_settlement::transfer(
        &state.db,
        user.id,
        request.to_user_id,
        request.amount,
        &request.name,
    )
    .await?;

    Ok(Json(TransferResponse {
        order_id: order.id,
        amount: order.amount,
        trade_time: order.trade_time,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(amount: Decimal, merchant_order_no: &str, name: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            order_type: OrderType::Payment,
            name: name.to_string(),
            amount,
            merchant_order_no: merchant_order_no.to_string(),
        }
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(50.00)).is_ok());
        assert!(validate_amount(dec!(0.01)).is_ok());
        assert!(validate_amount(dec!(0)).is_err());
        assert!(validate_amount(dec!(-5)).is_err());
        assert!(validate_amount(dec!(1.005)).is_err());
    }

    #[test]
    fn test_validate_create_order() {
        assert!(validate_create_order(&request(dec!(50.00), "M-1", "Goods")).is_ok());
        assert!(validate_create_order(&request(dec!(0), "M-1", "Goods")).is_err());
        assert!(validate_create_order(&request(dec!(50.00), "  ", "Goods")).is_err());
        assert!(validate_create_order(&request(dec!(50.00), "M-1", "")).is_err());
    }

    #[test]
    fn test_create_order_defaults_to_payment_type() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{"name": "Goods", "amount": "50.00", "merchant_order_no": "M-1"}"#,
        )
        .unwrap();
        assert_eq!(request.order_type, OrderType::Payment);
        assert_eq!(request.amount, dec!(50.00));
    }
}
