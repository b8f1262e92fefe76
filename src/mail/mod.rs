//! Outbound email delivery.
//!
//! The pipeline only sees the `Mailer` trait. Two backends are provided:
//! - **SendGrid**: HTTP API with a bearer credential (default)
//! - **SMTP**: relay via lettre

pub mod sendgrid;
pub mod smtp;

pub use sendgrid::{SendGridConfig, SendGridMailer};
pub use smtp::{SmtpConfig, SmtpMailer};

use async_trait::async_trait;

use crate::error::DeliveryError;

/// Outcome of an accepted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Status code reported by the provider (HTTP status, or SMTP reply code).
    pub status: u16,
}

/// Sends HTML email from the configured sender address.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Deliver one HTML message. Any status outside 2xx/3xx is an error.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}
