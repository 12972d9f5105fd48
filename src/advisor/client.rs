use std::time::Duration;

use anyhow::Context;
use axum::async_trait;
use serde_json::json;
use tokio::time::sleep;
use tracing::warn;

use crate::config::AdvisorConfig;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the completion text, or an error for any transport failure,
    /// non-success status, or missing configuration. Callers substitute a
    /// fallback message; the error never reaches the end user.
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String>;
}

/// Chat-completions client for the Groq OpenAI-compatible endpoint.
pub struct GroqClient {
    http: reqwest::Client,
    config: AdvisorConfig,
}

impl GroqClient {
    pub fn new(http: reqwest::Client, config: AdvisorConfig) -> Self {
        Self { http, config }
    }

    async fn request(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> anyhow::Result<String> {
        let res = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(payload)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .context("completion request")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!("completion endpoint returned {status}: {body}");
        }

        let body: serde_json::Value = res.json().await.context("completion body")?;
        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .context("completion response missing content")
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .context("completion API key not configured")?;
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let payload = json!({
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
        });

        // Single attempt unless max_attempts raises it.
        let attempts = self.config.max_attempts.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
            match self.request(&url, api_key, &payload).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(attempt, error = %format!("{e:#}"), "completion attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("completion never attempted")))
    }
}
