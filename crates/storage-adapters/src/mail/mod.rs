//! # Mail transports
//!
//! Outbound delivery for the `MailTransport` port.

#[cfg(feature = "mail-http")]
pub mod http;

#[cfg(feature = "mail-http")]
pub use http::HttpMailer;

use async_trait::async_trait;
use domains::{MailMessage, MailTransport, Result};

/// Development transport: records that a message went out without
/// delivering it. The body is never logged because it carries reset codes.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        tracing::info!(to = %message.to, subject = %message.subject, "mail dispatched (log transport)");
        Ok(())
    }
}
