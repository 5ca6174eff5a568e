//! # Argon2 password hashing
//!
//! Every hash gets a fresh random salt and is stored as a PHC string
//! (`$argon2id$v=19$m=19456,t=2,p=1$...`), so the salt and cost travel with
//! the hash and verification needs nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use domains::{AppError, PasswordHash, Result};

#[derive(Default, Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash(&self, plaintext: &str) -> Result<PasswordHash> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("failed to hash password: {e}")))?;
        Ok(PasswordHash::from_phc(phc.to_string()))
    }

    /// A malformed stored hash verifies nothing.
    pub fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        let parsed = match PhcHash::new(hash.as_str()) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not a PHC string");
                return false;
            }
        };
        self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
    }
}
