//! # Domain Models
//!
//! These structs represent the core entities of goodfeed.
//! We use UUID v7 for time-ordered, globally unique identification.

pub mod feed;
pub mod user;

pub use feed::{Comment, CommentView, Post, PostPatch, PostView};
pub use user::{
    normalize_email, AccountDetails, Actor, PasswordHash, Registration, Role, User, UserPatch,
    UserSummary,
};

use bytes::Bytes;
use mime::Mime;

/// A file received from a client, handed to the `ImageHost` as-is.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: Mime,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Bytes>, content_type: Mime) -> Self {
        Self { bytes: bytes.into(), content_type }
    }
}
