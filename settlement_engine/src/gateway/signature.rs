use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha512;
use sps_common::{Secret, Vnd};
use thiserror::Error;

use crate::gateway::{AMOUNT, SECURE_HASH, SECURE_HASH_TYPE};

type HmacSha512 = Hmac<Sha512>;

/// Gateway query parameters, keyed by name.
pub type GatewayParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Error)]
pub enum SignatureError {
    #[error("The gateway hash secret cannot be used as an HMAC key")]
    InvalidKey,
    #[error("{0} is too large to send to the gateway")]
    AmountOutOfRange(Vnd),
}

/// Percent-encodes `s` the way ECMAScript's `encodeURIComponent` does. `A-Z a-z 0-9 - _ . ! ~ * ' ( )` pass through.
pub fn encode_uri_component(s: &str) -> String {
    // urlencoding leaves only `A-Z a-z 0-9 - _ . ~` alone
    urlencoding::encode(s)
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// The string the gateway signs: every parameter except the signature fields, encoded, sorted by encoded key and
/// joined as `key=value` pairs. Spaces in values become `+`.
pub fn canonical_query(params: &GatewayParams) -> String {
    let mut pairs = params
        .iter()
        .filter(|(k, _)| k.as_str() != SECURE_HASH && k.as_str() != SECURE_HASH_TYPE)
        .map(|(k, v)| (encode_uri_component(k), encode_uri_component(v).replace("%20", "+")))
        .collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

/// HMAC-SHA512 signing and verification of gateway parameters with the merchant's shared secret.
#[derive(Debug, Clone)]
pub struct SignatureCodec {
    secret: Secret<String>,
}

impl SignatureCodec {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    fn mac(&self, params: &GatewayParams) -> Result<HmacSha512, SignatureError> {
        let mut mac =
            HmacSha512::new_from_slice(self.secret.reveal().as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
        mac.update(canonical_query(params).as_bytes());
        Ok(mac)
    }

    /// The lowercase hex signature of `params`. Signature fields already present are ignored.
    pub fn sign(&self, params: &GatewayParams) -> Result<String, SignatureError> {
        let digest = self.mac(params)?.finalize().into_bytes();
        Ok(hex::encode(digest))
    }

    /// Checks `supplied` (hex, either case) against the signature of `params` in constant time.
    ///
    /// Anything unexpected in attacker-controlled input, such as a non-hex or truncated hash, or an amount that is
    /// not a non-negative integer, is reported as an invalid signature rather than an error.
    pub fn verify(&self, params: &GatewayParams, supplied: &str) -> bool {
        if let Some(amount) = params.get(AMOUNT) {
            if let Err(e) = Vnd::from_gateway_amount(amount) {
                debug!("🔐️ Rejecting signature over a malformed amount. {e}");
                return false;
            }
        }
        let Ok(supplied) = hex::decode(supplied.trim()) else {
            debug!("🔐️ Supplied signature is not valid hex");
            return false;
        };
        match self.mac(params) {
            Ok(mac) => mac.verify_slice(&supplied).is_ok(),
            Err(e) => {
                error!("🔐️ {e}");
                false
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> GatewayParams {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn codec() -> SignatureCodec {
        SignatureCodec::new(Secret::new("SECRETKEY123".to_string()))
    }

    #[test]
    fn encodes_like_encode_uri_component() {
        assert_eq!(encode_uri_component("abc-_.!~*'()"), "abc-_.!~*'()");
        assert_eq!(encode_uri_component("a b&c=d/e"), "a%20b%26c%3Dd%2Fe");
        assert_eq!(encode_uri_component("Thanh toán"), "Thanh%20to%C3%A1n");
        assert_eq!(encode_uri_component("https://x.vn/r?a=1"), "https%3A%2F%2Fx.vn%2Fr%3Fa%3D1");
    }

    #[test]
    fn canonical_query_sorts_and_drops_signature_fields() {
        let p = params(&[
            ("vnp_OrderInfo", "Thanh toan don hang #5"),
            ("vnp_Amount", "20000000"),
            ("vnp_SecureHash", "abc"),
            ("vnp_SecureHashType", "HmacSHA512"),
            ("vnp_Command", "pay"),
        ]);
        assert_eq!(
            canonical_query(&p),
            "vnp_Amount=20000000&vnp_Command=pay&vnp_OrderInfo=Thanh+toan+don+hang+%235"
        );
    }

    #[test]
    fn signature_is_hmac_sha512_hex() {
        let p = params(&[("vnp_Amount", "1000000"), ("vnp_TxnRef", "VNP1T1")]);
        let sig = codec().sign(&p).unwrap();
        assert_eq!(sig.len(), 128);
        assert!(sig.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));

        let mut mac = HmacSha512::new_from_slice(b"SECRETKEY123").unwrap();
        mac.update(b"vnp_Amount=1000000&vnp_TxnRef=VNP1T1");
        assert_eq!(sig, hex::encode(mac.finalize().into_bytes()));
    }

    #[test]
    fn verify_accepts_own_signature_in_either_case() {
        let mut p = params(&[("vnp_Amount", "1000000"), ("vnp_ResponseCode", "00"), ("vnp_TxnRef", "VNP1T1")]);
        let sig = codec().sign(&p).unwrap();
        p.insert(SECURE_HASH.into(), sig.clone());
        assert!(codec().verify(&p, &sig));
        assert!(codec().verify(&p, &sig.to_uppercase()));
    }

    #[test]
    fn verify_rejects_tampering_and_junk() {
        let mut p = params(&[("vnp_Amount", "1000000"), ("vnp_TxnRef", "VNP1T1")]);
        let sig = codec().sign(&p).unwrap();
        assert!(!codec().verify(&p, "not hex"));
        assert!(!codec().verify(&p, &sig[..64]));
        assert!(!codec().verify(&p, ""));
        let other = SignatureCodec::new(Secret::new("other".to_string()));
        assert!(!other.verify(&p, &sig));
        p.insert("vnp_Amount".into(), "9000000".into());
        assert!(!codec().verify(&p, &sig));
        p.insert("vnp_Amount".into(), "-100".into());
        let sig = codec().sign(&p).unwrap();
        assert!(!codec().verify(&p, &sig));
    }
}
