//! JSON-over-HTTP mail API transport (Mailgun/Postmark style endpoints).

use async_trait::async_trait;
use domains::{AppError, MailMessage, MailTransport, Result};
use serde::Serialize;

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, message: MailMessage) -> Result<()> {
        let body = OutboundMail {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MailDelivery(format!("mail API unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::MailDelivery(format!("mail API answered {status}")));
        }
        tracing::info!(to = %message.to, "mail accepted by API");
        Ok(())
    }
}
