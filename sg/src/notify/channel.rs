//! Notification channels
//!
//! The notifier is written against [`NotificationChannel`] only. Two
//! implementations truly dispatch (SMTP, webhook); [`LogChannel`] records
//! intent and nothing else, and is what the loop falls back to when no
//! channel is configured - a missing channel degrades dispatch, it never
//! fails the cycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;

/// Transient dispatch failure; the alert stays unsent and is retried on the
/// next notifier run
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("webhook request failed: {0}")]
    Http(String),

    #[error("webhook rejected with status {status}")]
    Rejected { status: u16 },
}

/// One-shot notification dispatch
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ChannelError>;

    /// Short name for logs and reports
    fn name(&self) -> &'static str;
}

/// SMTP dispatch via lettre
pub struct SmtpChannel {
    transport: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
    from: String,
}

impl SmtpChannel {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: &str,
    ) -> Result<Self, ChannelError> {
        use lettre::transport::smtp::authentication::Credentials;

        let creds = Credentials::new(username.to_string(), password.to_string());
        let transport = lettre::AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ChannelError::Smtp(format!("relay setup: {e}")))?
            .port(port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl NotificationChannel for SmtpChannel {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        use lettre::AsyncTransport;
        use lettre::message::header::ContentType;

        debug!(%to, %subject, "SmtpChannel::send: called");

        let email = lettre::Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| ChannelError::Smtp(format!("from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| ChannelError::Smtp(format!("to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| ChannelError::Smtp(format!("build: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| ChannelError::Smtp(format!("send: {e}")))?;

        debug!(%to, "SmtpChannel::send: dispatched");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// JSON POST dispatch to a configured webhook URL
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        debug!(url = %self.url, %subject, "WebhookChannel::send: called");

        let payload = serde_json::json!({
            "to": to,
            "subject": subject,
            "body": body,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChannelError::Rejected {
                status: resp.status().as_u16(),
            });
        }

        debug!(url = %self.url, "WebhookChannel::send: dispatched");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Records the notification in the log and reports success.
///
/// Alerts dispatched through this channel are marked sent: delivery is
/// best-effort from the core's perspective, and the recorded intent is the
/// delivery.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        info!(%to, %subject, body_len = body.len(), "notification recorded (log-only channel)");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Build the configured channel, falling back to log-only.
///
/// SMTP needs host, username, and a password in the configured environment
/// variable; a webhook needs only its URL. Missing configuration is not an
/// error - the notifier degrades to recording intent.
pub fn channel_from_config(config: &NotifyConfig) -> Arc<dyn NotificationChannel> {
    if !config.smtp_host.is_empty() && !config.smtp_username.is_empty() {
        match std::env::var(&config.smtp_password_env) {
            Ok(password) => {
                match SmtpChannel::new(
                    &config.smtp_host,
                    config.smtp_port,
                    &config.smtp_username,
                    &password,
                    &config.from,
                ) {
                    Ok(channel) => {
                        info!(host = %config.smtp_host, "Using SMTP notification channel");
                        return Arc::new(channel);
                    }
                    Err(e) => {
                        warn!(error = %e, "SMTP channel setup failed, falling back");
                    }
                }
            }
            Err(_) => {
                warn!(
                    env = %config.smtp_password_env,
                    "SMTP configured but password env var not set, falling back"
                );
            }
        }
    }

    if !config.webhook_url.is_empty() {
        info!(url = %config.webhook_url, "Using webhook notification channel");
        return Arc::new(WebhookChannel::new(&config.webhook_url));
    }

    warn!("No notification channel configured, notifications will be log-only");
    Arc::new(LogChannel)
}
