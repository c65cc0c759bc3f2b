//! Session tokens.
//!
//! A token has the form `<session id>.<secret>`. The server keeps only the
//! SHA-256 of the secret and compares hashes in constant time.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SECRET_BYTES: usize = 32;

/// A freshly issued token. `secret_hash` is what gets stored.
#[derive(Debug, Clone)]
pub struct IssuedSecret {
    pub secret: String,
    pub secret_hash: String,
}

/// Generate a random secret and its hash.
pub fn generate_secret() -> IssuedSecret {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let secret = hex::encode(bytes);
    let secret_hash = hash_secret(&secret);
    IssuedSecret {
        secret,
        secret_hash,
    }
}

/// Hex-encoded SHA-256 of a token secret.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Check a presented secret against a stored hash.
pub fn secret_matches(secret: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_secret(secret), stored_hash)
}

pub fn format_token(session_id: &str, secret: &str) -> String {
    format!("{}.{}", session_id, secret)
}

/// Split a token into session ID and secret.
pub fn parse_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.split_once('.')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
