//! Outgoing email
//!
//! Services talk to a [`Mailer`]; which transport sits behind it is decided
//! at startup from the `[mail]` config section.

pub mod http;
pub mod templates;

use async_trait::async_trait;
use tracing::info;

pub use http::HttpMailer;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "Outgoing email (log transport)");
        info!("{}", email.html);
        Ok(())
    }
}
