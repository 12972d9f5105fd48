use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::{rngs::OsRng, Rng};
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, warn};

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Local-part + `@` + domain + TLD of at least two letters.
pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Six-digit numeric one-time code for password reset.
pub fn generate_reset_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user email
    pub name: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::minutes(config.ttl_minutes),
        }
    }

    pub fn sign(&self, email: &str, name: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: email.to_string(),
            name: name.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(email, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

/// The session identity a valid token carries.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub name: String,
}

/// Extracts and validates the Bearer session token. Protected operations
/// reject missing and invalid tokens with the same generic message.
pub struct AuthUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired session token");
                return Err(ApiError::Unauthorized);
            }
        };

        Ok(AuthUser(Session {
            email: claims.sub,
            name: claims.name,
        }))
    }
}

#[cfg(test)]
mod email_tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("first.last+tag@sub.domain.org"));
        assert!(is_valid_email("x_y%z@ex.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@example.c"));
        assert!(!is_valid_email("al ice@example.com"));
    }
}


#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = keys();
        let token = keys.sign("alice@example.com", "Alice").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.name, "Alice");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn verify_rejects_other_secret() {
        let token = keys().sign("alice@example.com", "Alice").expect("sign");
        let other = JwtKeys::from_config(&JwtConfig {
            secret: "different".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        });
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        assert!(keys().verify("not-a-token").is_err());
    }
}

#[cfg(test)]
mod reset_code_tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
