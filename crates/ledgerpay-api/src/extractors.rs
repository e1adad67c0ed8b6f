//! Request extractors
//!
//! Session/OAuth authentication itself lives at the edge; by the time a
//! request reaches these handlers the verified user id rides in the
//! `x-user-id` header. Merchant integration calls authenticate themselves
//! with their API-key pair in `x-client-id`/`x-client-secret`.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use ledgerpay_core::PayError;
use ledgerpay_db::{MerchantApiKey, User};

use crate::{ApiError, AppState};

const USER_ID_HEADER: &str = "x-user-id";
const CLIENT_ID_HEADER: &str = "x-client-id";
const CLIENT_SECRET_HEADER: &str = "x-client-secret";

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// The authenticated, active user behind the request.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id: i64 = header_str(parts, USER_ID_HEADER)
            .and_then(|v| v.parse().ok())
            .ok_or(PayError::Unauthorized)?;

        let user = state
            .db
            .user_repo()
            .find_active(user_id)
            .await?
            .ok_or(PayError::Unauthorized)?;

        Ok(Self(user))
    }
}

/// The merchant behind an API-key-scoped integration call.
pub struct MerchantAuth {
    pub api_key: MerchantApiKey,
    pub merchant: User,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for MerchantAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let client_id = header_str(parts, CLIENT_ID_HEADER).ok_or(PayError::Unauthorized)?;
        let client_secret =
            header_str(parts, CLIENT_SECRET_HEADER).ok_or(PayError::Unauthorized)?;

        let api_key = state
            .db
            .merchant_key_repo()
            .find_by_client_id(client_id)
            .await?
            .ok_or(PayError::Unauthorized)?;
        if api_key.client_secret != client_secret {
            return Err(PayError::Unauthorized.into());
        }

        let merchant = state
            .db
            .user_repo()
            .find_active(api_key.user_id)
            .await?
            .ok_or(PayError::MerchantInfoNotFound)?;

        Ok(Self { api_key, merchant })
    }
}
