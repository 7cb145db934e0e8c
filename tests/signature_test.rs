mod common;

use adyen_reconcile::domain::error::ReconcileError;
use adyen_reconcile::services::signature::{SIGNATURE_FIELD, sign, signing_message, verify};
use common::HMAC_KEY;
use std::collections::BTreeMap;

/// Adyen's documented sample notification.
fn sample() -> BTreeMap<String, String> {
    [
        ("pspReference", "7914073381342284"),
        ("merchantAccountCode", "TestMerchant"),
        ("merchantReference", "TestPayment-1407325143704"),
        ("amount.value", "1130"),
        ("amount.currency", "EUR"),
        ("eventCode", "AUTHORISATION"),
        ("success", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn signed_sample() -> BTreeMap<String, String> {
    let mut params = sample();
    let signature = sign(&params, HMAC_KEY).unwrap();
    params.insert(SIGNATURE_FIELD.to_string(), signature);
    params
}

#[test]
fn message_uses_fixed_order_and_blanks_for_missing_fields() {
    assert_eq!(
        signing_message(&sample()),
        "7914073381342284::TestMerchant:TestPayment-1407325143704:1130:EUR:AUTHORISATION:true"
    );
}

#[test]
fn signature_matches_known_vector() {
    assert_eq!(
        sign(&sample(), HMAC_KEY).unwrap(),
        "coqCmt/IZ4E3CzPvMY8zTjQVL5hYJUiBRg8UU+iCWo0="
    );
}

#[test]
fn valid_signature_verifies() {
    assert!(verify(&signed_sample(), Some(HMAC_KEY)).unwrap());
}

#[test]
fn key_case_does_not_matter() {
    assert!(verify(&signed_sample(), Some(&HMAC_KEY.to_lowercase())).unwrap());
}

#[test]
fn tampered_amount_is_rejected() {
    let mut params = signed_sample();
    params.insert("amount.value".into(), "1".into());
    assert!(!verify(&params, Some(HMAC_KEY)).unwrap());
}

#[test]
fn unsigned_fields_do_not_matter() {
    let mut params = signed_sample();
    params.insert("additionalData.paymentLinkId".into(), "PL-1".into());
    params.insert("reason".into(), "whatever".into());
    assert!(verify(&params, Some(HMAC_KEY)).unwrap());
}

#[test]
fn missing_or_garbled_signature_is_false_not_error() {
    assert!(!verify(&sample(), Some(HMAC_KEY)).unwrap());

    let mut params = sample();
    params.insert(SIGNATURE_FIELD.into(), "%%% not base64 %%%".into());
    assert!(!verify(&params, Some(HMAC_KEY)).unwrap());

    params.insert(SIGNATURE_FIELD.into(), "c2hvcnQ=".into());
    assert!(!verify(&params, Some(HMAC_KEY)).unwrap());
}

#[test]
fn wrong_key_is_rejected() {
    let other = "00112233445566778899AABBCCDDEEFF00112233445566778899AABBCCDDEEFF";
    assert!(!verify(&signed_sample(), Some(other)).unwrap());
}

#[test]
fn missing_key_is_configuration_error() {
    let err = verify(&signed_sample(), None).unwrap_err();
    assert!(matches!(err, ReconcileError::Configuration(_)));

    let err = verify(&signed_sample(), Some("   ")).unwrap_err();
    assert!(matches!(err, ReconcileError::Configuration(_)));

    let err = verify(&signed_sample(), Some("not-hex")).unwrap_err();
    assert!(matches!(err, ReconcileError::Configuration(_)));
}
