//! Merchant API key repository

use sqlx::PgPool;

use crate::{DbResult, MerchantApiKey};

pub struct MerchantKeyRepo {
    pool: PgPool,
}

impl MerchantKeyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_client_id(&self, client_id: &str) -> DbResult<Option<MerchantApiKey>> {
        let key =
            sqlx::query_as::<_, MerchantApiKey>("SELECT * FROM merchant_api_keys WHERE client_id = $1")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(key)
    }

    pub async fn find_by_user_id(&self, user_id: i64) -> DbResult<Option<MerchantApiKey>> {
        let key =
            sqlx::query_as::<_, MerchantApiKey>("SELECT * FROM merchant_api_keys WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(key)
    }
}
