//! # auth-adapters
//!
//! Credential handling for goodfeed: Argon2 password hashing and, behind
//! the `auth-jwt` feature, JWT bearer tokens.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtCredentialStore, DEFAULT_TOKEN_TTL_SECS};
