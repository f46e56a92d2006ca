use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::error;

use crate::config::PasswordScheme;
use crate::error::AppError;

/// `hex(sha256(salt || plaintext))`.
///
/// Deterministic on purpose: stored digests are looked up directly. The shared
/// salt and fast hash make this unsuitable against offline attacks; deployments
/// that can migrate should run with [`PasswordScheme::Argon2`].
pub fn legacy_hash(plain: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hash_argon2(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AppError::Internal(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// A stored value that does not parse as a PHC string never verifies.
pub fn verify_argon2(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!(error = %e, "argon2 parse hash error");
            false
        }
    }
}

lazy_static! {
    static ref DUMMY_HASH: String = hash_argon2("no-such-user").unwrap_or_default();
}

/// Runs a full argon2 verification against a throwaway hash so unknown
/// usernames cost as much as wrong passwords. Never succeeds.
pub fn verify_unknown_user(plain: &str) -> bool {
    let _ = verify_argon2(plain, &DUMMY_HASH);
    false
}

/// Password hashing configured once at startup.
#[derive(Clone)]
pub struct Hasher {
    scheme: PasswordScheme,
    salt: String,
}

impl Hasher {
    pub fn new(scheme: PasswordScheme, salt: impl Into<String>) -> Self {
        Self {
            scheme,
            salt: salt.into(),
        }
    }

    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    /// Digest to persist for a new user.
    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        match self.scheme {
            PasswordScheme::Legacy => Ok(legacy_hash(plain, &self.salt)),
            PasswordScheme::Argon2 => hash_argon2(plain),
        }
    }

    pub fn verify(&self, plain: &str, stored: &str) -> bool {
        match self.scheme {
            PasswordScheme::Legacy => legacy_hash(plain, &self.salt) == stored,
            PasswordScheme::Argon2 => verify_argon2(plain, stored),
        }
    }
}
