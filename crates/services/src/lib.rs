//! # services
//!
//! Application logic for goodfeed: the authorization policy and the
//! identity, post and comment lifecycles. Everything here talks to the
//! outside world through the ports defined in `domains`.

pub mod comments;
pub mod identity;
pub mod policy;
pub mod posts;

pub use comments::CommentService;
pub use identity::{AuthSession, IdentityService};
pub use policy::{AccessPolicy, PolicyConfig};
pub use posts::PostService;
