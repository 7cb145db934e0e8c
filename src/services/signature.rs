//! Webhook authenticity check.
//!
//! The processor signs each notification item with HMAC-SHA256 over a
//! colon-joined list of fields, keyed by the hex-decoded merchant HMAC key,
//! and ships the base64 digest in `additionalData.hmacSignature`.

use {
    crate::domain::error::ReconcileError,
    base64::{Engine as _, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    std::collections::BTreeMap,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_FIELD: &str = "additionalData.hmacSignature";

/// Fields covered by the signature, in signing order.
pub const SIGNED_FIELDS: [&str; 8] = [
    "pspReference",
    "originalReference",
    "merchantAccountCode",
    "merchantReference",
    "amount.value",
    "amount.currency",
    "eventCode",
    "success",
];

/// Missing fields sign as empty strings.
pub fn signing_message(params: &BTreeMap<String, String>) -> String {
    SIGNED_FIELDS
        .iter()
        .map(|field| params.get(*field).map(String::as_str).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(":")
}

fn keyed_mac(params: &BTreeMap<String, String>, hex_key: Option<&str>) -> Result<HmacSha256, ReconcileError> {
    let hex_key = hex_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ReconcileError::Configuration("webhook HMAC key is not configured".into()))?;
    let key = hex::decode(hex_key)
        .map_err(|e| ReconcileError::Configuration(format!("webhook HMAC key is not hex: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| ReconcileError::Configuration(format!("webhook HMAC key rejected: {e}")))?;
    mac.update(signing_message(params).as_bytes());
    Ok(mac)
}

/// Base64 signature for `params`.
pub fn sign(params: &BTreeMap<String, String>, hex_key: &str) -> Result<String, ReconcileError> {
    let mac = keyed_mac(params, Some(hex_key))?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `Ok(false)` for any mismatch or malformed signature; `Err` only when the
/// key itself is missing or unusable.
pub fn verify(params: &BTreeMap<String, String>, hex_key: Option<&str>) -> Result<bool, ReconcileError> {
    let mac = keyed_mac(params, hex_key)?;

    let Some(signature) = params.get(SIGNATURE_FIELD).filter(|s| !s.is_empty()) else {
        return Ok(false);
    };
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return Ok(false);
    };

    Ok(mac.verify_slice(&expected).is_ok())
}
