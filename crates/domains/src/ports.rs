//! # Core Traits (Ports)
//!
//! Every adapter must implement these traits to be wired into the binary.
//! Services only ever see `Arc<dyn Port>`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{Actor, Comment, ImageUpload, PasswordHash, Post, User};
use crate::otp::OtpCode;

/// Durable storage for accounts.
///
/// Implementations enforce uniqueness of `name` and `email` and report a
/// violation as `AppError::Conflict`, both on `create` and on `save`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Loads every listed user that still exists; order is unspecified.
    async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn create(&self, user: User) -> Result<User>;
    /// Persists the record as given. Never rehashes the password.
    async fn save(&self, user: User) -> Result<User>;
    /// Hard delete. Returns the removed record, `None` if it was absent.
    async fn delete(&self, id: Uuid) -> Result<Option<User>>;
}

/// Durable storage for posts and their like sets.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>>;
    async fn list(&self) -> Result<Vec<Post>>;
    async fn create(&self, post: Post) -> Result<Post>;
    async fn save(&self, post: Post) -> Result<Post>;
    /// Returns `false` if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>>;
    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;
    async fn create(&self, comment: Comment) -> Result<Comment>;
    async fn save(&self, comment: Comment) -> Result<Comment>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Image hosting contract for proof images and post pictures.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Stores the payload and returns the public URL to reference it by.
    async fn upload(&self, upload: ImageUpload) -> Result<String>;
}

/// A single outbound plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Fails with `AppError::MailDelivery` when the message was not accepted.
    async fn send(&self, message: MailMessage) -> Result<()>;
}

/// Time-bounded, single-use password reset codes keyed by email.
///
/// Entries for different emails must never contend with each other.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OtpLedger: Send + Sync {
    /// Issues a fresh code, replacing any pending one for `email`.
    async fn issue(&self, email: &str) -> Result<OtpCode>;
    /// Atomically redeems `code`. `Ok(false)` covers a wrong code, a missing
    /// record and an expired record alike.
    async fn consume(&self, email: &str, code: &OtpCode) -> Result<bool>;
}

/// Password hashing and bearer-token handling. CPU-bound, no I/O.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Salted one-way hash; two calls on the same input differ.
    fn hash_password(&self, plaintext: &str) -> Result<PasswordHash>;
    fn verify_password(&self, plaintext: &str, hash: &PasswordHash) -> bool;
    fn issue_token(&self, actor: Actor) -> Result<String>;
    /// Fails with `AppError::Unauthorized` for expired, malformed or mis-signed tokens.
    fn verify_token(&self, token: &str) -> Result<Actor>;
}
