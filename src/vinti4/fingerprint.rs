//! Fingerprint construction for the three message classes the gateway signs.
//!
//! Every fingerprint starts from the Base64 SHA-512 of the POS auth code, so
//! the secret itself never appears in the hashed payload, followed by a fixed,
//! positional list of fields. The field lists differ per message class and
//! must match the gateway byte for byte.

use bigdecimal::BigDecimal;

use super::hasher::digest_base64;
use super::response::TransactionResponse;

/// Fields that seal an outbound request.
#[derive(Debug, Clone)]
pub struct RequestFingerprintInput<'a> {
    pub timestamp: &'a str,
    pub amount: &'a BigDecimal,
    pub merchant_ref: &'a str,
    pub merchant_session: &'a str,
    pub pos_id: &'a str,
    pub currency: &'a str,
    pub transaction_code: &'a str,
    pub entity_code: Option<&'a str>,
    pub reference_number: Option<&'a str>,
}

/// Fingerprint for an outbound payment, token or refund request.
///
/// Entity code and reference number are appended only when present; an absent
/// value contributes nothing, not an empty string.
pub fn request_fingerprint(pos_auth_code: &str, input: &RequestFingerprintInput<'_>) -> String {
    let mut payload = digest_base64(pos_auth_code);
    payload.push_str(input.timestamp);
    payload.push_str(&minor_units(input.amount));
    payload.push_str(input.merchant_ref.trim());
    payload.push_str(input.merchant_session.trim());
    payload.push_str(input.pos_id.trim());
    payload.push_str(input.currency.trim());
    payload.push_str(input.transaction_code.trim());

    if let Some(entity_code) = input.entity_code {
        payload.push_str(&canonical_integer(entity_code));
    }
    if let Some(reference_number) = input.reference_number {
        payload.push_str(&canonical_integer(reference_number));
    }

    digest_base64(&payload)
}

/// Expected `resultFingerPrint` for a callback reporting success.
pub fn success_fingerprint(pos_auth_code: &str, response: &TransactionResponse) -> String {
    let entity_code = response
        .entity_code
        .as_deref()
        .map(canonical_integer)
        .unwrap_or_default();
    let reference_number = response
        .reference_number
        .as_deref()
        .map(canonical_integer)
        .unwrap_or_default();

    let secret_hash = digest_base64(pos_auth_code);

    let parts: [&str; 16] = [
        &secret_hash,
        field(&response.message_type),
        field(&response.clearing_period),
        field(&response.transaction_id),
        field(&response.merchant_ref),
        field(&response.merchant_session),
        field(&response.amount),
        field(&response.message_id),
        field(&response.pan),
        field(&response.merchant_resp),
        field(&response.timestamp),
        &entity_code,
        &reference_number,
        field(&response.client_receipt),
        field(&response.additional_error_message),
        field(&response.reload_code),
    ];

    digest_base64(&parts.concat())
}

/// Expected `resultFingerPrint` for a callback reporting a gateway error.
pub fn error_fingerprint(pos_auth_code: &str, response: &TransactionResponse) -> String {
    let secret_hash = digest_base64(pos_auth_code);
    let parts: [&str; 10] = [
        &secret_hash,
        field(&response.message_type),
        field(&response.message_id),
        field(&response.error_code),
        field(&response.error_detail),
        field(&response.error_description),
        field(&response.merchant_ref),
        field(&response.merchant_session),
        field(&response.additional_error_message),
        field(&response.timestamp),
    ];

    digest_base64(&parts.concat())
}

/// Numeric canonical form of an entity code or reference number.
///
/// Leading zeros are stripped on the digit string itself so long reference
/// numbers never go through a fixed-width integer. Values that are not purely
/// numeric are returned trimmed and otherwise untouched.
pub fn canonical_integer(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return value.to_string();
    }

    match value.trim_start_matches('0') {
        "" => "0".to_string(),
        digits => digits.to_string(),
    }
}

/// `amount * 100` rendered without a fractional part.
pub fn minor_units(amount: &BigDecimal) -> String {
    (amount.clone() * BigDecimal::from(100)).with_scale(0).to_string()
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}
