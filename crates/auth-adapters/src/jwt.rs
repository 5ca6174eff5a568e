//! # JWT credential store
//!
//! HS256 bearer tokens carrying `{id, role}` with a fixed lifetime, combined
//! with Argon2 password hashing into the `CredentialStore` port.

use chrono::{DateTime, Duration, Utc};
use domains::{Actor, AppError, CredentialStore, PasswordHash, Result, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::password::Argon2Hasher;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: Uuid,
    role: Role,
    iat: i64,
    exp: i64,
}

pub struct JwtCredentialStore {
    hasher: Argon2Hasher,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtCredentialStore {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The lifetime is a hard limit.
        validation.leeway = 0;
        Self {
            hasher: Argon2Hasher::new(),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn with_default_ttl(secret: &[u8]) -> Self {
        Self::new(secret, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    /// Signs a token as if issued at `issued_at`.
    pub fn issue_token_at(&self, actor: Actor, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            id: actor.id,
            role: actor.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
    }
}

impl CredentialStore for JwtCredentialStore {
    fn hash_password(&self, plaintext: &str) -> Result<PasswordHash> {
        self.hasher.hash(plaintext)
    }

    fn verify_password(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        self.hasher.verify(plaintext, hash)
    }

    fn issue_token(&self, actor: Actor) -> Result<String> {
        self.issue_token_at(actor, Utc::now())
    }

    fn verify_token(&self, token: &str) -> Result<Actor> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AppError::Unauthorized("Invalid or expired token.".into())
        })?;
        Ok(Actor::new(data.claims.id, data.claims.role))
    }
}
