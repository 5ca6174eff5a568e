//! goodfeed/crates/domains/src/lib.rs
//!
//! The central domain types and port definitions for goodfeed.

pub mod errors;
pub mod models;
pub mod otp;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use otp::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn test_comment_creation_v7() {
        let post = Uuid::now_v7();
        let author = Uuid::now_v7();
        let comment = Comment::new(post, author, "Hello Rust!".to_string());
        assert_eq!(comment.post, post);
        assert_eq!(comment.user, author);
        assert_eq!(comment.id.get_version_num(), 7);
    }
}
