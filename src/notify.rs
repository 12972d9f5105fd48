use std::time::Duration;

use axum::async_trait;
use serde_json::json;
use tracing::{error, warn};

use crate::config::MailConfig;

/// Best-effort message delivery. Failure is a boolean, never an error the
/// caller has to unwind.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> bool;
}

/// Delivers mail through an HTTP transactional-mail API.
pub struct HttpMailer {
    http: reqwest::Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(http: reqwest::Client, config: MailConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> bool {
        let (Some(endpoint), Some(api_key)) = (&self.config.endpoint, &self.config.api_key) else {
            warn!("mail delivery not configured, dropping message");
            return false;
        };

        let payload = json!({
            "from": self.config.sender,
            "to": [recipient],
            "subject": subject,
            "text": body,
        });

        match self
            .http
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(res) if res.status().is_success() => true,
            Ok(res) => {
                error!(status = %res.status(), "mail delivery rejected");
                false
            }
            Err(e) => {
                error!(error = %e, "mail delivery failed");
                false
            }
        }
    }
}
