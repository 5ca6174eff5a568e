//! # storage-adapters
//!
//! Outbound infrastructure for goodfeed: entity repositories, OTP ledgers,
//! image hosting and mail delivery. Heavier backends sit behind features
//! (`db-postgres`, `redis`, `mail-http`); the in-memory and local-disk
//! implementations are always compiled.

pub mod mail;
pub mod media;
pub mod memory;
pub mod otp;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use mail::LogMailer;
pub use media::{LocalImageHost, DEFAULT_MAX_IMAGE_BYTES};
pub use memory::{MemoryCommentRepository, MemoryPostRepository, MemoryUserRepository};
pub use otp::MemoryOtpLedger;
