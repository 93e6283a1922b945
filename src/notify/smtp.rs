//! SMTP delivery via lettre's async transport
//!
//! Port 587 with STARTTLS is the default; `implicit_tls = true` switches to
//! a TLS-wrapped connection (usually port 465).

use super::{DeliveryOutcome, EmailTransport};
use crate::config::EmailSection;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::response::{Code, Response};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// Error type for email delivery failures
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.)
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),
}

impl EmailError {
    /// SMTP reply code, when the server produced one
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            EmailError::Transport(e) => e.status().and_then(code_number),
            _ => None,
        }
    }
}

fn code_number(code: Code) -> Option<u16> {
    code.to_string().parse().ok()
}

/// Only a positive completion reply (2xx) means the relay took the message
pub fn outcome_from_reply(code: u16, detail: &str) -> DeliveryOutcome {
    if (200..300).contains(&code) {
        DeliveryOutcome::Delivered
    } else {
        DeliveryOutcome::Failed {
            code: Some(code),
            reason: detail.to_string(),
        }
    }
}

/// Plain-text alert email
pub fn compose_message(
    from: &Mailbox,
    recipient: &str,
    subject: &str,
    body: &str,
) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.clone())
        .to(recipient.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| EmailError::Build(e.to_string()))
}

/// Mailer bound to one SMTP relay
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the relay transport. No connection is made until the first send.
    pub fn from_config(
        config: &EmailSection,
        credentials: Option<(String, String)>,
    ) -> Result<Self, EmailError> {
        let from: Mailbox = config.from.parse()?;

        let mut builder = if config.implicit_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        }
        .port(config.port());

        if let Some((user, pass)) = credentials {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    async fn try_send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Response, EmailError> {
        let message = compose_message(&self.from, recipient, subject, body)?;
        Ok(self.transport.send(message).await?)
    }
}

#[async_trait]
impl EmailTransport for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> DeliveryOutcome {
        match self.try_send(recipient, subject, body).await {
            Ok(response) => {
                debug!(code = %response.code(), "SMTP reply");
                let detail = response.first_line().unwrap_or_default();
                match code_number(response.code()) {
                    Some(code) => outcome_from_reply(code, detail),
                    None => DeliveryOutcome::Failed {
                        code: None,
                        reason: format!("unreadable reply code {}", response.code()),
                    },
                }
            }
            Err(e) => DeliveryOutcome::Failed {
                code: e.reply_code(),
                reason: e.to_string(),
            },
        }
    }
}
