//! Email alert delivery
//!
//! The [`Notifier`] checks the network link before each send and reports a
//! typed [`DeliveryOutcome`]. Alerts are never queued or retried; a failed
//! send is logged and the alert is dropped.

pub mod smtp;

use crate::alerts::AlertEvent;
use crate::connectivity::{ConnectivityManager, NetworkLink};
use crate::transport::BrokerSession;
use async_trait::async_trait;
use tracing::{info, warn};

pub use smtp::{EmailError, SmtpMailer};

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// `code` is the SMTP reply code when the server answered
    Failed { code: Option<u16>, reason: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Outbound mail channel
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> DeliveryOutcome;
}

/// Sends alert emails to a single configured recipient
pub struct Notifier<E> {
    transport: E,
    recipient: String,
}

impl<E: EmailTransport> Notifier<E> {
    pub fn new(transport: E, recipient: impl Into<String>) -> Self {
        Self {
            transport,
            recipient: recipient.into(),
        }
    }

    /// Deliver one alert. Only the network link is restored first; the
    /// broker session is not needed for mail.
    pub async fn notify<N, B>(
        &self,
        connectivity: &mut ConnectivityManager<N, B>,
        event: &AlertEvent,
    ) -> DeliveryOutcome
    where
        N: NetworkLink,
        B: BrokerSession,
    {
        if let Err(e) = connectivity.ensure_network().await {
            warn!(subject = %event.subject, "Alert not sent: {}", e);
            return DeliveryOutcome::Failed {
                code: None,
                reason: e.to_string(),
            };
        }

        let outcome = self
            .transport
            .send(&self.recipient, &event.subject, &event.body)
            .await;

        match &outcome {
            DeliveryOutcome::Delivered => {
                info!(to = %self.recipient, subject = %event.subject, "Alert email sent");
            }
            DeliveryOutcome::Failed { code, reason } => {
                warn!(
                    to = %self.recipient,
                    subject = %event.subject,
                    code = ?code,
                    "Failed to send alert email: {}",
                    reason
                );
            }
        }
        outcome
    }
}
