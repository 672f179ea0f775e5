//! Outbound email over SMTP with STARTTLS.

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpSettings;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid {field} address '{value}': {source}")]
    Address {
        field: &'static str,
        value: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("could not connect to SMTP server {host}:{port}: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: lettre::transport::smtp::Error,
    },

    #[error("SMTP authentication failed: {0}")]
    Authentication(#[source] lettre::transport::smtp::Error),

    #[error("SMTP server rejected the message: {0}")]
    Transmission(#[source] lettre::transport::smtp::Error),
}

/// Username and password for SMTP AUTH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub user: String,
    pub password: String,
}

/// Everything needed to send one digest email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub host: String,
    pub port: u16,
    pub credentials: Option<SmtpCredentials>,
    pub from_name: String,
    pub from_email: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl DeliveryRequest {
    /// Pair resolved settings with a recipient and rendered body. Fails with
    /// the names of the missing settings when any required one is unset.
    pub fn from_settings(
        smtp: &SmtpSettings,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<Self, Vec<&'static str>> {
        match (&smtp.user, &smtp.password, &smtp.from_email) {
            (Some(user), Some(password), Some(from_email)) => Ok(Self {
                host: smtp.host.clone(),
                port: smtp.port,
                credentials: Some(SmtpCredentials {
                    user: user.clone(),
                    password: password.clone(),
                }),
                from_name: smtp.from_name.clone(),
                from_email: from_email.clone(),
                to: to.to_string(),
                subject: subject.to_string(),
                html_body: html_body.to_string(),
            }),
            _ => Err(smtp.missing_fields()),
        }
    }

    /// Multipart/alternative message whose single part is the HTML body.
    pub fn build_message(&self) -> Result<Message, DeliveryError> {
        let from_address: lettre::Address = self
            .from_email
            .parse()
            .map_err(|source| DeliveryError::Address {
                field: "from",
                value: self.from_email.clone(),
                source,
            })?;
        let from = Mailbox::new(Some(self.from_name.clone()), from_address);

        let to: Mailbox = self.to.parse().map_err(|source| DeliveryError::Address {
            field: "to",
            value: self.to.clone(),
            source,
        })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(
                MultiPart::alternative().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(self.html_body.clone()),
                ),
            )?;

        Ok(message)
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<(), DeliveryError>;
}

/// Sends through an SMTP relay, upgrading with STARTTLS before AUTH.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmtpMailer;

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<(), DeliveryError> {
        let email = request.build_message()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&request.host)
            .map_err(|source| DeliveryError::Connection {
                host: request.host.clone(),
                port: request.port,
                source,
            })?
            .port(request.port);

        if let Some(creds) = &request.credentials {
            builder = builder.credentials(Credentials::new(creds.user.clone(), creds.password.clone()));
        }

        let mailer = builder.build();

        // Greeting, EHLO, STARTTLS and AUTH happen here; anything rejected
        // before the envelope is a connection or login problem.
        mailer
            .test_connection()
            .await
            .map_err(|e| classify_smtp_error(e, SmtpStage::Connect, request))?;

        mailer
            .send(email)
            .await
            .map_err(|e| classify_smtp_error(e, SmtpStage::Send, request))?;

        tracing::info!(to = %request.to, subject = %request.subject, "email sent");

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmtpStage {
    Connect,
    Send,
}

/// 530/534/535 are the authentication replies at any stage. Other replies
/// before the envelope mean the session never opened; during the send they
/// are a rejection of the message. No reply at all is a connection failure.
fn classify_smtp_error(
    error: lettre::transport::smtp::Error,
    stage: SmtpStage,
    request: &DeliveryRequest,
) -> DeliveryError {
    let code = error.status().map(|code| code.to_string());
    match (stage, code.as_deref()) {
        (_, Some("530" | "534" | "535")) => DeliveryError::Authentication(error),
        (SmtpStage::Send, Some(_)) => DeliveryError::Transmission(error),
        _ => DeliveryError::Connection {
            host: request.host.clone(),
            port: request.port,
            source: error,
        },
    }
}
