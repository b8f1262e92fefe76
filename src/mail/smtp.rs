//! SMTP backend via lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use super::{DeliveryReceipt, Mailer};
use crate::error::DeliveryError;

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub timeout: Duration,
}

/// Mailer that relays through an authenticated SMTP server.
pub struct SmtpMailer {
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, html_body: &str) -> Result<Message, DeliveryError> {
        Message::builder()
            .from(self.config.from_address.parse().map_err(|e| {
                DeliveryError::InvalidAddress {
                    address: self.config.from_address.clone(),
                    reason: format!("{e}"),
                }
            })?)
            .to(to.parse().map_err(|e| DeliveryError::InvalidAddress {
                address: to.to_string(),
                reason: format!("{e}"),
            })?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| DeliveryError::Transport {
                provider: "smtp".into(),
                reason: format!("Failed to build email: {e}"),
            })
    }
}

/// Blocking send, run in `spawn_blocking`.
fn relay(config: &SmtpConfig, email: &Message) -> Result<DeliveryReceipt, DeliveryError> {
    let creds = Credentials::new(
        config.username.clone(),
        config.password.expose_secret().to_string(),
    );

    let transport = SmtpTransport::relay(&config.host)
        .map_err(|e| DeliveryError::Transport {
            provider: "smtp".into(),
            reason: format!("SMTP relay error: {e}"),
        })?
        .port(config.port)
        .credentials(creds)
        .timeout(Some(config.timeout))
        .build();

    let response = transport.send(email).map_err(|e| DeliveryError::Transport {
        provider: "smtp".into(),
        reason: format!("SMTP send failed: {e}"),
    })?;

    let status = response.code().to_string().parse().unwrap_or(250);
    Ok(DeliveryReceipt { status })
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let email = self.build_message(to, subject, html_body)?;
        let config = self.config.clone();

        let receipt = tokio::task::spawn_blocking(move || relay(&config, &email))
            .await
            .map_err(|e| DeliveryError::Transport {
                provider: "smtp".into(),
                reason: format!("SMTP send task panicked: {e}"),
            })??;

        tracing::info!(recipient = %to, "Email sent via SMTP");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer(from: &str) -> SmtpMailer {
        SmtpMailer::new(SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "user".into(),
            password: SecretString::from("pw"),
            from_address: from.into(),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn builds_html_message() {
        let message = mailer("noreply@pencom.example")
            .build_message("alice@example.com", "Re: Pension", "<p>Hello</p>")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Re: Pension"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<p>Hello</p>"));
    }

    #[test]
    fn invalid_recipient_is_rejected_before_sending() {
        let err = mailer("noreply@pencom.example")
            .build_message("not an address", "s", "b")
            .unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }

    #[test]
    fn invalid_sender_is_rejected_before_sending() {
        let err = mailer("broken")
            .build_message("alice@example.com", "s", "b")
            .unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidAddress { .. }));
    }
}
