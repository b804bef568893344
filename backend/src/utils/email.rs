use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;

/// Result of a delivery attempt. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("invalid mailbox {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_html(&self, to: &str, subject: &str, html_body: &str) -> DeliveryOutcome;
}

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    skip_send: bool,
}

impl EmailService {
    /// Builds a STARTTLS transport authenticated with the configured
    /// credentials. Without a username the transport talks plain SMTP, which
    /// is only meant for local relays.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let transport = if config.smtp_username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
                .port(config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            );
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
                .port(config.smtp_port)
                .credentials(creds)
                .build()
        };

        let address = config
            .from_address
            .parse()
            .map_err(|source| EmailError::Address {
                address: config.from_address.clone(),
                source,
            })?;

        Ok(Self {
            transport,
            from: Mailbox::new(Some(config.from_name.clone()), address),
            skip_send: config.skip_send,
        })
    }

    async fn deliver(&self, to: &str, subject: &str, html_body: &str) -> Result<(), EmailError> {
        let recipient: Mailbox = to.parse().map_err(|source| EmailError::Address {
            address: to.to_string(),
            source,
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        self.transport.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_html(&self, to: &str, subject: &str, html_body: &str) -> DeliveryOutcome {
        if self.skip_send {
            tracing::debug!(to, subject, "SMTP_SKIP_SEND is set, message not sent");
            return DeliveryOutcome::Delivered;
        }
        match self.deliver(to, subject, html_body).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(err) => DeliveryOutcome::Failed(err.to_string()),
        }
    }
}
