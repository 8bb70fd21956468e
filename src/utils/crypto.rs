use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::error::{Error, Result};

pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// A malformed stored hash counts as a failed verification.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    match PasswordHash::new(hashed) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

static DECOY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Runs a full verification against a hash of an unguessable password, so a
/// login for an unknown user costs as much as a wrong password.
pub fn verify_against_decoy(plain: &str) {
    let decoy = DECOY_HASH.get_or_init(|| {
        let secret = SaltString::generate(&mut OsRng);
        hash_password(secret.as_str()).ok()
    });
    if let Some(hash) = decoy {
        let _ = verify_password(plain, hash);
    }
}

/// SHA-256 over the parts, each terminated by a unit separator so that
/// `("ab", "c")` and `("a", "bc")` never collide.
pub fn digest_parts(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hasher.finalize().into()
}

pub fn digest_hex(parts: &[&str]) -> String {
    hex::encode(digest_parts(parts))
}

/// Sampling seed derived from a digest, kept within the signed 64-bit range
/// the reasoning API accepts.
pub fn seed_from_digest(digest: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head) & (i64::MAX as u64)
}

/// Content fingerprint of a resume: case-folded, whitespace-collapsed.
pub fn resume_fingerprint(resume_text: &str) -> String {
    let normalized = resume_text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    digest_hex(&[&normalized])
}
