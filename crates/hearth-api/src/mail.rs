//! Outbound mail over an HTTP relay
//!
//! The relay receives `{from, to, subject, html}` as JSON. The request
//! carries a client-level timeout so a slow relay cannot stall a request
//! past its budget; failures surface as `DeliveryError` and the caller
//! decides whether that is fatal.

use async_trait::async_trait;
use hearth_core::config::MailConfig;
use hearth_core::{DeliveryError, MailSender};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Mailer POSTing to a configured HTTP relay
pub struct HttpMailer {
    client: Client,
    relay_url: String,
    api_key: Option<String>,
    from_address: String,
}

#[derive(Debug, Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            relay_url: config.relay_url.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), DeliveryError> {
        let mail = OutboundMail {
            from: &self.from_address,
            to: recipient,
            subject,
            html: html_body,
        };

        let mut request = self.client.post(&self.relay_url).json(&mail);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError(format!("relay request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DeliveryError(format!(
                "relay returned {}",
                response.status()
            )));
        }

        tracing::debug!(%recipient, %subject, "mail handed to relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_mail_serialization() {
        let mail = OutboundMail {
            from: "noreply@hearth.local",
            to: "user@example.com",
            subject: "Hello",
            html: "<p>Hi</p>",
        };

        let json = serde_json::to_value(&mail).unwrap();
        assert_eq!(json["from"], "noreply@hearth.local");
        assert_eq!(json["to"], "user@example.com");
        assert_eq!(json["html"], "<p>Hi</p>");
    }
}
