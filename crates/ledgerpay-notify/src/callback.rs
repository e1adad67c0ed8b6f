//! Callback construction and delivery

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

use ledgerpay_core::money::money_string;
use ledgerpay_core::sign::epay_signature;
use ledgerpay_db::{MerchantApiKey, Order};

/// User-Agent sent on every callback request.
pub const USER_AGENT: &str = "LinuxDo-Pay/1.0";

/// Payment channel identifier in the `type` parameter.
pub const PAY_TYPE: &str = "epay";

const TRADE_STATUS_SUCCESS: &str = "TRADE_SUCCESS";

/// Callback delivery failures. All of them are retryable.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("invalid notify url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("callback returned status {0}")]
    Status(StatusCode),

    #[error("callback returned non-success body: {0:?}")]
    Body(String),
}

/// Assemble the signed parameter set for a settled order.
pub fn build_callback_params(order: &Order, api_key: &MerchantApiKey) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("pid".into(), api_key.client_id.clone()),
        ("trade_no".into(), order.id.to_string()),
        ("out_trade_no".into(), order.merchant_order_no.clone()),
        ("type".into(), PAY_TYPE.into()),
        ("name".into(), order.name.clone()),
        ("money".into(), money_string(order.amount)),
        ("trade_status".into(), TRADE_STATUS_SUCCESS.into()),
        ("sign_type".into(), "MD5".into()),
    ];
    let sign = epay_signature(&params, &api_key.client_secret);
    params.push(("sign".into(), sign));
    params
}

/// Append the signed parameters to the notify URL, preserving any query
/// string the merchant configured.
pub fn signed_notify_url(
    notify_url: &str,
    params: &[(String, String)],
) -> Result<Url, CallbackError> {
    let mut url =
        Url::parse(notify_url).map_err(|e| CallbackError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    Ok(url)
}

/// Deliver one callback attempt.
///
/// Success requires HTTP 200 and a body that, trimmed and lowercased,
/// equals `success`; anything else is a retryable failure.
pub async fn send_callback(client: &Client, url: Url) -> Result<(), CallbackError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(CallbackError::Status(status));
    }

    let body = response.text().await?;
    if body.trim().to_lowercase() != "success" {
        return Err(CallbackError::Body(body));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledgerpay_core::{OrderStatus, OrderType};
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        Order {
            id: 9001,
            order_type: OrderType::Payment,
            status: OrderStatus::Success,
            payer_user_id: 3,
            payee_user_id: 7,
            name: "Test Goods".into(),
            amount: dec!(50.00),
            fee: dec!(1.50),
            merchant_order_no: "M-2026-001".into(),
            trade_time: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    fn sample_key() -> MerchantApiKey {
        MerchantApiKey {
            id: 1,
            client_id: "client-abc".into(),
            client_secret: "s3cret".into(),
            user_id: 7,
            notify_url: "https://shop.example.com/notify".into(),
            redirect_url: "https://shop.example.com/return".into(),
            test_mode: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_callback_params() {
        let params = build_callback_params(&sample_order(), &sample_key());
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("pid"), "client-abc");
        assert_eq!(get("trade_no"), "9001");
        assert_eq!(get("out_trade_no"), "M-2026-001");
        assert_eq!(get("money"), "50.00");
        assert_eq!(get("trade_status"), "TRADE_SUCCESS");
        assert_eq!(get("sign_type"), "MD5");
        assert_eq!(get("sign").len(), 32);
    }

    #[test]
    fn test_sign_matches_recomputation() {
        let params = build_callback_params(&sample_order(), &sample_key());
        let sign = params.iter().find(|(k, _)| k == "sign").unwrap().1.clone();
        // epay_signature skips the sign parameter itself, so re-signing the
        // full set reproduces the same value
        assert_eq!(epay_signature(&params, "s3cret"), sign);
    }

    #[test]
    fn test_notify_url_without_query() {
        let params = vec![("a".to_string(), "1".to_string())];
        let url = signed_notify_url("https://shop.example.com/notify", &params).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/notify?a=1");
    }

    #[test]
    fn test_notify_url_preserves_existing_query() {
        let params = vec![("a".to_string(), "1".to_string())];
        let url = signed_notify_url("https://shop.example.com/notify?shop=5", &params).unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/notify?shop=5&a=1");
    }

    #[test]
    fn test_notify_url_encodes_values() {
        let params = vec![("name".to_string(), "Test Goods".to_string())];
        let url = signed_notify_url("https://shop.example.com/notify", &params).unwrap();
        assert!(url.as_str().contains("name=Test+Goods"));
    }

    #[test]
    fn test_invalid_notify_url() {
        assert!(matches!(
            signed_notify_url("not a url", &[]),
            Err(CallbackError::InvalidUrl(_))
        ));
    }
}
