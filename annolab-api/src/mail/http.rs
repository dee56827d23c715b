//! Delivery through an HTTP mail API
//!
//! Posts `{from, to, subject, html}` as JSON with a bearer API key, the
//! request shape shared by the common transactional mail providers.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::{Email, Mailer};

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: Option<SecretString>, from: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build mail HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let body = SendRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to reach mail endpoint {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("Mail provider returned {}: {}", status, detail));
        }

        info!(to = %email.to, "Email sent");
        Ok(())
    }
}
