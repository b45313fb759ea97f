use anyhow::{Result, anyhow};
use argon2::Argon2;
use rand::{Rng, distr::Alphanumeric};
use subtle::ConstantTimeEq;

/// Length of the per-user salt generated at signup.
pub const SALT_LEN: usize = 100;

const DIGEST_LEN: usize = 32;

/// Derive the stored digest for `password` under `salt` (Argon2id, hex-encoded).
/// Deterministic for a given pair.
pub fn stretch(password: &str, salt: &str) -> Result<String> {
    let mut out = [0u8; DIGEST_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| anyhow!("Password stretching failed: {}", e))?;
    Ok(hex::encode(out))
}

/// Fresh random alphanumeric string of `len` characters from the thread-local CSPRNG.
pub fn salt(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Check `password` against a stored `(salt, digest)` pair.
pub fn verify(password: &str, salt: &str, digest: &str) -> Result<bool> {
    let computed = stretch(password, salt)?;
    Ok(computed.as_bytes().ct_eq(digest.as_bytes()).into())
}
