use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use tracing::debug;

/// The tuple the core consumes from a delegated-provider token exchange.
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange(&self, access_token: &str) -> anyhow::Result<ExternalIdentity>;
}

/// Resolves a Google access token against the userinfo endpoint.
pub struct GoogleIdentity {
    http: reqwest::Client,
    userinfo_url: String,
}

impl GoogleIdentity {
    pub fn new(http: reqwest::Client, userinfo_url: String) -> Self {
        Self { http, userinfo_url }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn exchange(&self, access_token: &str) -> anyhow::Result<ExternalIdentity> {
        let res = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("identity provider request")?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("identity provider returned {status}");
        }

        let body: serde_json::Value = res.json().await.context("identity provider body")?;
        let email = body
            .get("email")
            .and_then(|v| v.as_str())
            .context("userinfo response missing email")?
            .trim()
            .to_lowercase();
        let name = body
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Google User")
            .to_string();

        debug!(%email, "identity exchange succeeded");
        Ok(ExternalIdentity { email, name })
    }
}
