//! Mail delivery collaborator.
//!
//! Delivery is best effort: callers log a failed send and carry on.
//! `SmtpEmailSender` relays through an SMTP server; `LogEmailSender` is the
//! local fallback and only logs who would have been mailed.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error describing why it failed.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        // The body carries the reset link, so it stays out of the logs.
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            "email not delivered, no SMTP relay configured"
        );
        Ok(())
    }
}

/// How the SMTP session is secured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain connect, then upgrade with STARTTLS (usually port 587).
    #[default]
    StartTls,
    /// TLS from the first byte (usually port 465).
    Tls,
    /// No encryption. Local relays and test servers only.
    None,
}

impl TlsMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartTls => "starttls",
            Self::Tls => "tls",
            Self::None => "none",
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "starttls" => Ok(Self::StartTls),
            "tls" => Ok(Self::Tls),
            "none" => Ok(Self::None),
            other => Err(format!("unsupported smtp security: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from: String,
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl SmtpConfig {
    #[must_use]
    pub fn new(host: String, from: String) -> Self {
        Self {
            host,
            port: 587,
            username: None,
            password: None,
            from,
            tls: TlsMode::StartTls,
            timeout: Duration::from_secs(10),
        }
    }

    fn credentials(&self) -> Result<Option<Credentials>> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Ok(Some(Credentials::new(
                user.clone(),
                password.expose_secret().to_string(),
            ))),
            (None, None) => Ok(None),
            _ => bail!("smtp username and password must be set together"),
        }
    }
}

/// Sends mail through an SMTP relay. Connections are pooled and opened on
/// first use.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// # Errors
    /// Returns an error if the sender address, credentials, or TLS settings
    /// are invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid smtp sender address: {}", config.from))?;

        let builder = match config.tls {
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .context("failed to configure smtp tls")?,
            TlsMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .context("failed to configure smtp starttls")?
            }
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };
        let builder = builder.port(config.port).timeout(Some(config.timeout));
        let builder = match config.credentials()? {
            Some(credentials) => builder.credentials(credentials),
            None => builder,
        };

        debug!(
            host = %config.host,
            port = config.port,
            tls = %config.tls,
            "smtp relay configured"
        );
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    #[instrument(skip_all, fields(to_email = %message.to_email))]
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = build_message(&self.from, message)?;
        let response = self
            .transport
            .send(email)
            .await
            .map_err(|err| anyhow!("smtp delivery failed: {err}"))?;
        debug!(code = %response.code(), "smtp relay accepted message");
        Ok(())
    }
}

fn build_message(from: &Mailbox, message: &EmailMessage) -> Result<Message> {
    let to = message
        .to_email
        .parse::<Mailbox>()
        .with_context(|| format!("invalid recipient address: {}", message.to_email))?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(message.html_body.clone())
        .context("failed to build email")
}

pub(crate) fn password_reset_message(
    to_email: &str,
    reset_url: &str,
    ttl_minutes: i64,
) -> EmailMessage {
    EmailMessage {
        to_email: to_email.to_string(),
        subject: "Password Reset Request".to_string(),
        html_body: format!(
            "<p>To reset your password, click the following link:</p>\
             <p><a href=\"{reset_url}\">{reset_url}</a></p>\
             <p>The link expires in {ttl_minutes} minutes. If you did not ask for a reset, ignore this email.</p>"
        ),
    }
}
