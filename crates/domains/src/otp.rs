//! # One-time reset codes
//!
//! Six-digit numeric codes used to authorize a password reset.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// How long an issued code stays redeemable, in seconds.
pub const DEFAULT_OTP_TTL_SECS: i64 = 10 * 60;

pub fn default_otp_ttl() -> Duration {
    Duration::seconds(DEFAULT_OTP_TTL_SECS)
}

#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Draws a fresh code in `100000..=999999`.
    pub fn generate() -> Self {
        let n: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self(n.to_string())
    }

    /// Wraps a code supplied by a client. No shape check: a malformed code
    /// simply never matches.
    pub fn from_input(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes must not end up in logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

/// A pending code and its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub code: OtpCode,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn issued_at(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self { code: OtpCode::generate(), expires_at: now + ttl }
    }

    /// Exact match strictly before the deadline.
    pub fn redeemable(&self, code: &OtpCode, now: DateTime<Utc>) -> bool {
        self.code == *code && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..1_000 {
            let code = OtpCode::generate();
            assert_eq!(code.as_str().len(), 6);
            let n: u32 = code.as_str().parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn record_expires_at_deadline() {
        let now = Utc::now();
        let record = OtpRecord::issued_at(now, default_otp_ttl());
        let code = record.code.clone();
        assert!(record.redeemable(&code, now + Duration::minutes(9)));
        assert!(!record.redeemable(&code, now + default_otp_ttl()));
        assert!(!record.redeemable(&OtpCode::from_input("000000"), now));
    }

    #[test]
    fn debug_output_hides_the_code() {
        assert_eq!(format!("{:?}", OtpCode::from_input("123456")), "OtpCode(******)");
    }
}
