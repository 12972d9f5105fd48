use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Generation parameters and retry policy for the completion collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub userinfo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub jwt: JwtConfig,
    pub advisor: AdvisorConfig,
    pub mail: MailConfig,
    pub google: GoogleConfig,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "fintrack"),
            audience: env_or("JWT_AUDIENCE", "fintrack-users"),
            ttl_minutes: env_parsed("JWT_TTL_MINUTES", 60),
        };
        let advisor = AdvisorConfig {
            api_key: std::env::var("GROQ_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env_or("ADVISOR_BASE_URL", "https://api.groq.com/openai/v1"),
            model: env_or("ADVISOR_MODEL", "gemma2-9b-it"),
            max_tokens: env_parsed("ADVISOR_MAX_TOKENS", 500),
            temperature: env_parsed("ADVISOR_TEMPERATURE", 0.7),
            top_p: env_parsed("ADVISOR_TOP_P", 0.9),
            timeout_secs: env_parsed("ADVISOR_TIMEOUT_SECS", 30),
            max_attempts: env_parsed("ADVISOR_MAX_ATTEMPTS", 1),
            retry_delay_ms: env_parsed("ADVISOR_RETRY_DELAY_MS", 500),
        };
        let mail = MailConfig {
            endpoint: std::env::var("MAIL_ENDPOINT").ok().filter(|v| !v.is_empty()),
            api_key: std::env::var("MAIL_API_KEY").ok().filter(|v| !v.is_empty()),
            sender: env_or("MAIL_SENDER", "no-reply@fintrack.local"),
        };
        let google = GoogleConfig {
            userinfo_url: env_or(
                "GOOGLE_USERINFO_URL",
                "https://www.googleapis.com/oauth2/v1/userinfo",
            ),
        };
        Ok(Self {
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            jwt,
            advisor,
            mail,
            google,
        })
    }
}
