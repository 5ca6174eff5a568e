//! # OTP ledgers
//!
//! Backends for the `OtpLedger` port. Both keep per-email atomicity without
//! a ledger-wide lock.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryOtpLedger;
#[cfg(feature = "redis")]
pub use self::redis::RedisOtpLedger;
