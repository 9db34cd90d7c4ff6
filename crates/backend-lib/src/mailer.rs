// ============================
// crates/backend-lib/src/mailer.rs
// ============================
//! Outgoing mail.
//!
//! The auth service hands finished messages to a [`Mailer`]. `LogMailer` is
//! the development sender and only logs; `MemoryMailer` keeps an outbox that
//! can be inspected.
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// A rendered plain text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery abstraction
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Sender that logs instead of delivering
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        info!(to = %message.to, subject = %message.subject, "email send stub");
        Ok(())
    }
}

/// Sender that records every message in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.outbox.lock().await.clone()
    }

    /// The most recent message addressed to `to`
    pub async fn last_to(&self, to: &str) -> Option<EmailMessage> {
        self.outbox
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        self.outbox.lock().await.push(message.clone());
        Ok(())
    }
}

/// Build the password reset message
pub fn reset_password_email(to: &str, name: &str, url: &str) -> EmailMessage {
    let body = format!(
        "Hi {name},\n\n\
         Someone requested a password reset for your account. \
         Open the link below to choose a new password:\n\n\
         {url}\n\n\
         If you did not request this, you can ignore this email."
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body,
    }
}

/// Build the message confirming an email change, sent to the current address
pub fn change_email_verification_email(to: &str, name: &str, url: &str) -> EmailMessage {
    let first_name = name.split_whitespace().next().unwrap_or("there");
    let body = format!(
        "Hi {first_name},\n\n\
         You requested to change the email address on your account. \
         Open the link below to confirm the change:\n\n\
         {url}\n\n\
         If you did not request this, you can ignore this email."
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Verify your new email address".to_string(),
        body,
    }
}
