use std::sync::Arc;

use crate::advisor::client::{CompletionClient, GroqClient};
use crate::config::AppConfig;
use crate::identity::{GoogleIdentity, IdentityProvider};
use crate::notify::{HttpMailer, Mailer};
use crate::store::JsonStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<JsonStore>,
    pub mailer: Arc<dyn Mailer>,
    pub advisor: Arc<dyn CompletionClient>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(JsonStore::new(&config.data_dir));
        store.init().await?;

        let http = reqwest::Client::new();
        let mailer = Arc::new(HttpMailer::new(http.clone(), config.mail.clone()));
        let advisor = Arc::new(GroqClient::new(http.clone(), config.advisor.clone()));
        let identity = Arc::new(GoogleIdentity::new(
            http,
            config.google.userinfo_url.clone(),
        ));

        Ok(Self {
            config,
            store,
            mailer,
            advisor,
            identity,
        })
    }

    /// State wired to fake collaborators: mail always delivers, the
    /// completion and identity collaborators always fail. Tests swap in
    /// their own impls where they need different behavior.
    #[cfg(test)]
    pub fn fake(data_dir: &std::path::Path) -> Self {
        use axum::async_trait;

        struct FakeMailer;
        #[async_trait]
        impl Mailer for FakeMailer {
            async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> bool {
                true
            }
        }

        struct FakeCompletion;
        #[async_trait]
        impl CompletionClient for FakeCompletion {
            async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<String> {
                anyhow::bail!("no completion collaborator in tests")
            }
        }

        struct FakeIdentity;
        #[async_trait]
        impl IdentityProvider for FakeIdentity {
            async fn exchange(
                &self,
                _access_token: &str,
            ) -> anyhow::Result<crate::identity::ExternalIdentity> {
                anyhow::bail!("no identity collaborator in tests")
            }
        }

        let config = Arc::new(AppConfig {
            data_dir: data_dir.to_path_buf(),
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            advisor: crate::config::AdvisorConfig {
                api_key: None,
                base_url: "http://localhost:0".into(),
                model: "test-model".into(),
                max_tokens: 500,
                temperature: 0.7,
                top_p: 0.9,
                timeout_secs: 1,
                max_attempts: 1,
                retry_delay_ms: 0,
            },
            mail: crate::config::MailConfig {
                endpoint: None,
                api_key: None,
                sender: "no-reply@test.local".into(),
            },
            google: crate::config::GoogleConfig {
                userinfo_url: "http://localhost:0/userinfo".into(),
            },
        });

        Self {
            config,
            store: Arc::new(JsonStore::new(data_dir)),
            mailer: Arc::new(FakeMailer),
            advisor: Arc::new(FakeCompletion),
            identity: Arc::new(FakeIdentity),
        }
    }
}
