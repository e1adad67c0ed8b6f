//! Order-token resolution
//!
//! An order token is only payable while its `order:<token>` entry lives in
//! the checkout index; after the TTL the order is unreachable even if the
//! row still exists.

use ledgerpay_core::{crypto, PayError};
use ledgerpay_db::{Database, MerchantApiKey, PayTier, User};
use tracing::debug;

use crate::EngineError;

/// Everything the settlement transaction needs, resolved up front.
///
/// Tier rows are resolved fresh per settlement and must not be reused
/// across transactions, since tiers can be reconfigured live.
#[derive(Debug, Clone)]
pub struct SettlementContext {
    pub order_id: i64,
    pub payer: User,
    pub merchant: User,
    pub api_key: MerchantApiKey,
    pub payer_tier: PayTier,
    pub merchant_tier: PayTier,
}

/// Self-pay / test-mode policy.
///
/// A merchant may only pay its own order in test mode, and a test-mode
/// merchant accepts no one else's money.
pub fn validate_test_mode(
    payer_id: i64,
    merchant_id: i64,
    test_mode: bool,
) -> Result<(), PayError> {
    if payer_id == merchant_id {
        if !test_mode {
            return Err(PayError::CannotPaySelf);
        }
    } else if test_mode {
        return Err(PayError::TestModeCannotProcessOrder);
    }
    Ok(())
}

/// Resolve an opaque `order_no` into a [`SettlementContext`] for `payer`.
pub async fn resolve_order_token(
    db: &Database,
    payer: &User,
    order_no: &str,
) -> Result<SettlementContext, EngineError> {
    let merchant_id = db
        .cache()
        .get_order_merchant(order_no)
        .await?
        .ok_or(PayError::OrderNotFound)?;

    let merchant = db
        .user_repo()
        .find_active(merchant_id)
        .await?
        .ok_or(PayError::MerchantInfoNotFound)?;

    let api_key = db
        .merchant_key_repo()
        .find_by_user_id(merchant.id)
        .await?
        .ok_or(PayError::MerchantInfoNotFound)?;

    validate_test_mode(payer.id, merchant.id, api_key.test_mode)?;

    let plaintext = crypto::decrypt(&merchant.sign_key, order_no)
        .map_err(|_| PayError::OrderNoFormatError)?;
    let order_id: i64 = plaintext.parse().map_err(|_| PayError::OrderNoFormatError)?;

    let payer_tier = db
        .pay_tier_repo()
        .find_for_score(payer.pay_score)
        .await?
        .ok_or(PayError::PayConfigNotFound)?;
    let merchant_tier = db
        .pay_tier_repo()
        .find_for_score(merchant.pay_score)
        .await?
        .ok_or(PayError::PayConfigNotFound)?;

    debug!(order_id, merchant_id = merchant.id, payer_id = payer.id, "order token resolved");

    Ok(SettlementContext {
        order_id,
        payer: payer.clone(),
        merchant,
        api_key,
        payer_tier,
        merchant_tier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_pay_requires_test_mode() {
        assert_eq!(
            validate_test_mode(7, 7, false),
            Err(PayError::CannotPaySelf)
        );
        assert_eq!(validate_test_mode(7, 7, true), Ok(()));
    }

    #[test]
    fn test_test_mode_rejects_other_payers() {
        assert_eq!(
            validate_test_mode(3, 7, true),
            Err(PayError::TestModeCannotProcessOrder)
        );
        assert_eq!(validate_test_mode(3, 7, false), Ok(()));
    }
}
