//! Webhook HMAC signing and verification.
//!
//! Outbound webhook bodies are signed with the subscription's secret and
//! sent in the `X-Webhook-Signature` header as `sha256=<hex>`. Inbound
//! tracking webhooks are verified the same way when a shared secret is
//! configured.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Prefix identifying the signature algorithm in the header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 of `payload` keyed by `secret`.
pub fn compute_webhook_hmac(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex_encode(&mac.finalize().into_bytes())
}

/// Header value for a signed payload.
pub fn signature_header_value(secret: &str, payload: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", compute_webhook_hmac(secret, payload))
}

/// Verify a signature header against `payload`.
///
/// Accepts the value with or without the `sha256=` prefix. The comparison
/// runs in constant time over the decoded MAC.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], header: &str) -> bool {
    let hex = header.trim();
    let hex = hex.strip_prefix(SIGNATURE_PREFIX).unwrap_or(hex);
    let Some(expected) = hex_decode(hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Derive a fresh subscription secret: SHA-256 hex of a random UUID.
pub fn generate_webhook_secret() -> String {
    let seed = uuid::Uuid::new_v4();
    format!("{:x}", Sha256::digest(seed.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
