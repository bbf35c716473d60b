use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Generates a SAML 1.1 `RequestID`.
///
/// `xsd:ID` values must not start with a digit, hence the `_` prefix.
/// Returns 23 characters: `_` + 16 random bytes as base64url.
#[must_use]
pub fn generate_request_id() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    format!("_{}", URL_SAFE_NO_PAD.encode(random_bytes))
}

/// Generates an opaque session identifier for the session cookie.
///
/// Returns a 43-character URL-safe string (32 random bytes → base64url).
#[must_use]
pub fn generate_session_id() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
