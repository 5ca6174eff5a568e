//! Process-local ledger. Codes live as long as the process does.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use domains::{default_otp_ttl, OtpCode, OtpLedger, OtpRecord, Result};

pub struct MemoryOtpLedger {
    entries: DashMap<String, OtpRecord>,
    ttl: Duration,
}

impl Default for MemoryOtpLedger {
    fn default() -> Self {
        Self::new(default_otp_ttl())
    }
}

impl MemoryOtpLedger {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl }
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> OtpCode {
        let record = OtpRecord::issued_at(now, self.ttl);
        let code = record.code.clone();
        self.entries.insert(email.to_string(), record);
        code
    }

    /// Removes the entry only if `code` redeems it, under the key's shard lock.
    pub fn consume_at(&self, email: &str, code: &OtpCode, now: DateTime<Utc>) -> bool {
        if self
            .entries
            .remove_if(email, |_, record| record.redeemable(code, now))
            .is_some()
        {
            return true;
        }
        self.entries.remove_if(email, |_, record| now >= record.expires_at);
        false
    }

    /// Drops every entry past its deadline.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, record| now < record.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl OtpLedger for MemoryOtpLedger {
    async fn issue(&self, email: &str) -> Result<OtpCode> {
        Ok(self.issue_at(email, Utc::now()))
    }

    async fn consume(&self, email: &str, code: &OtpCode) -> Result<bool> {
        Ok(self.consume_at(email, code, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn code_is_single_use() {
        let ledger = MemoryOtpLedger::default();
        let now = Utc::now();
        let code = ledger.issue_at("x@y.com", now);

        assert!(ledger.consume_at("x@y.com", &code, now));
        assert!(!ledger.consume_at("x@y.com", &code, now));
    }

    #[test]
    fn correct_code_fails_after_expiry() {
        let ledger = MemoryOtpLedger::default();
        let now = Utc::now();
        let code = ledger.issue_at("x@y.com", now);

        assert!(!ledger.consume_at("x@y.com", &code, now + Duration::minutes(10)));
        assert_eq!(ledger.pending(), 0, "expired entry is dropped on the failed attempt");
    }

    #[test]
    fn wrong_code_keeps_the_pending_one() {
        let ledger = MemoryOtpLedger::default();
        let now = Utc::now();
        let code = ledger.issue_at("x@y.com", now);
        let wrong = OtpCode::from_input(if code.as_str() == "111111" { "222222" } else { "111111" });

        assert!(!ledger.consume_at("x@y.com", &wrong, now));
        assert!(ledger.consume_at("x@y.com", &code, now));
    }

    #[test]
    fn reissue_replaces_the_previous_code() {
        let ledger = MemoryOtpLedger::default();
        let now = Utc::now();
        let first = ledger.issue_at("x@y.com", now);
        let mut second = ledger.issue_at("x@y.com", now);
        while second == first {
            second = ledger.issue_at("x@y.com", now);
        }

        assert!(!ledger.consume_at("x@y.com", &first, now));
        assert!(ledger.consume_at("x@y.com", &second, now));
    }

    #[test]
    fn purge_only_drops_expired_entries() {
        let ledger = MemoryOtpLedger::default();
        let now = Utc::now();
        ledger.issue_at("old@y.com", now - Duration::minutes(11));
        ledger.issue_at("new@y.com", now);

        assert_eq!(ledger.purge_expired(now), 1);
        assert_eq!(ledger.pending(), 1);
    }

    #[tokio::test]
    async fn concurrent_consumers_redeem_once() {
        let ledger = Arc::new(MemoryOtpLedger::default());
        let code = ledger.issue("x@y.com").await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let code = code.clone();
                tokio::spawn(async move { ledger.consume("x@y.com", &code).await.unwrap() })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
