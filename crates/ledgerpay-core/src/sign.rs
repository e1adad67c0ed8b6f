//! Merchant callback signing (EPay convention)
//!
//! The callback signature is the lowercase hex MD5 of the query parameters
//! sorted by key and joined `k=v&…`, with the merchant's client secret
//! appended. Empty values and the `sign` parameter itself are excluded;
//! `sign_type` is part of the signed string.

use md5::{Digest, Md5};

/// Compute the EPay signature over a parameter set.
///
/// The input order does not matter; parameters are sorted by key before
/// hashing.
pub fn epay_signature(params: &[(String, String)], client_secret: &str) -> String {
    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, v)| k != "sign" && !v.is_empty())
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Md5::new();
    hasher.update(joined.as_bytes());
    hasher.update(client_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_signature_is_lowercase_hex() {
        let sig = epay_signature(&params(&[("pid", "1001"), ("money", "50.00")]), "secret");
        assert_eq!(sig.len(), 32);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_order_independent() {
        let a = epay_signature(
            &params(&[("pid", "1001"), ("money", "50.00"), ("trade_no", "7")]),
            "secret",
        );
        let b = epay_signature(
            &params(&[("trade_no", "7"), ("pid", "1001"), ("money", "50.00")]),
            "secret",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_values_and_sign_excluded() {
        let base = params(&[("pid", "1001"), ("money", "50.00")]);
        let mut with_noise = base.clone();
        with_noise.push(("name".to_string(), String::new()));
        with_noise.push(("sign".to_string(), "bogus".to_string()));
        assert_eq!(
            epay_signature(&base, "secret"),
            epay_signature(&with_noise, "secret")
        );
    }

    #[test]
    fn test_sign_type_is_signed() {
        let without = params(&[("pid", "1001")]);
        let mut with = without.clone();
        with.push(("sign_type".to_string(), "MD5".to_string()));
        assert_ne!(
            epay_signature(&without, "secret"),
            epay_signature(&with, "secret")
        );
    }

    #[test]
    fn test_secret_changes_signature() {
        let p = params(&[("pid", "1001")]);
        assert_ne!(epay_signature(&p, "a"), epay_signature(&p, "b"));
    }
}
