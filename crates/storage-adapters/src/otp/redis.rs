//! Redis-backed ledger. Survives restarts and is shared between replicas.
//!
//! Expiry is delegated to the key TTL; redemption is a compare-and-delete
//! script so a code can only ever be consumed once.

use async_trait::async_trait;
use deadpool_redis::{
    redis::{AsyncCommands, Script},
    Pool,
};
use domains::{AppError, OtpCode, OtpLedger, Result, DEFAULT_OTP_TTL_SECS};

const CONSUME_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

pub struct RedisOtpLedger {
    pool: Pool,
    ttl_secs: u64,
    consume: Script,
}

impl RedisOtpLedger {
    pub fn new(pool: Pool, ttl_secs: u64) -> Self {
        Self { pool, ttl_secs, consume: Script::new(CONSUME_SCRIPT) }
    }

    pub fn with_default_ttl(pool: Pool) -> Self {
        Self::new(pool, DEFAULT_OTP_TTL_SECS as u64)
    }

    fn key(email: &str) -> String {
        format!("goodfeed:otp:{email}")
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::internal(format!("redis pool: {e}")))
    }
}

#[async_trait]
impl OtpLedger for RedisOtpLedger {
    async fn issue(&self, email: &str) -> Result<OtpCode> {
        let code = OtpCode::generate();
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(Self::key(email), code.as_str(), self.ttl_secs)
            .await
            .map_err(|e| AppError::internal(format!("redis SET: {e}")))?;
        Ok(code)
    }

    async fn consume(&self, email: &str, code: &OtpCode) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = self
            .consume
            .key(Self::key(email))
            .arg(code.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::internal(format!("redis consume: {e}")))?;
        Ok(removed == 1)
    }
}
