use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use rand::Rng;
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;

/// 256 random bits, URL-safe base64 without padding.
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    B64.encode(bytes)
}

/// Constant-time equality for secrets such as CSRF tokens.
pub fn tokens_match(expected: &str, given: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(given.as_bytes()))
}
