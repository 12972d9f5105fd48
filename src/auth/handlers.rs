use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest,
            MessageResponse, PublicUser, RegisterRequest, ResetStartedResponse, SessionResponse,
            VerifyResetRequest,
        },
        repo::{ResetCode, User},
        services::{
            generate_reset_code, hash_password, is_valid_email, verify_password, AuthUser, JwtKeys,
        },
    },
    error::ApiError,
    state::AppState,
};

const RESET_CODE_TTL_MINUTES: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/verify-reset", post(verify_reset))
        .route("/auth/session", get(session))
}

fn issue_session(state: &AppState, user: &User, message: &str) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys
        .sign(&user.email, &user.name)
        .map_err(ApiError::Internal)?;
    Ok(AuthResponse {
        success: true,
        message: message.to_string(),
        token,
        user: PublicUser {
            name: user.name.clone(),
            email: user.email.clone(),
        },
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();
    payload.phone = payload.phone.trim().to_string();

    if payload.email.is_empty()
        || payload.password.is_empty()
        || payload.name.is_empty()
        || payload.phone.is_empty()
    {
        warn!("registration with missing fields");
        return Err(ApiError::Validation("All fields are required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email format".into()));
    }
    if payload.password.len() < 6 {
        warn!("password too short");
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }
    if payload.phone.len() < 10 {
        warn!("phone too short");
        return Err(ApiError::Validation("Invalid phone number".into()));
    }

    let user = User {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        password_hash: hash_password(&payload.password).map_err(ApiError::Internal)?,
        created_at: OffsetDateTime::now_utc(),
    };
    let created = User::create(&state.store, &user)
        .await
        .map_err(ApiError::Storage)?;
    if !created {
        warn!(email = %user.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    info!(email = %user.email, "user registered");
    Ok(Json(issue_session(&state, &user, "Registration successful")?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".into()));
    }

    let Some(user) = User::find(&state.store, &payload.email).await else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    // Externally-authenticated accounts have no password on file.
    if user.password_hash.is_empty() {
        warn!(email = %payload.email, "password login on external account");
        return Err(ApiError::InvalidCredentials);
    }

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(ApiError::Internal)?;
    if !ok {
        warn!(email = %payload.email, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    info!(email = %user.email, "user logged in");
    Ok(Json(issue_session(&state, &user, "Login successful")?))
}

#[instrument(skip(state, payload))]
pub async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.access_token.trim().is_empty() {
        return Err(ApiError::Validation("Access token is required".into()));
    }

    let identity = match state.identity.exchange(&payload.access_token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "identity exchange failed");
            return Err(ApiError::ProviderAuth);
        }
    };

    let user = match User::find(&state.store, &identity.email).await {
        Some(user) => user,
        None => {
            let user = User {
                name: identity.name,
                email: identity.email,
                phone: "Not provided".into(),
                password_hash: String::new(),
                created_at: OffsetDateTime::now_utc(),
            };
            let created = User::create(&state.store, &user)
                .await
                .map_err(ApiError::Storage)?;
            if created {
                info!(email = %user.email, "provisioned user from identity provider");
                user
            } else {
                // Lost a provisioning race; the account now exists.
                User::find(&state.store, &user.email)
                    .await
                    .ok_or_else(|| {
                        ApiError::Internal(anyhow::anyhow!("provisioned user vanished"))
                    })?
            }
        }
    };

    info!(email = %user.email, "user logged in via identity provider");
    Ok(Json(issue_session(&state, &user, "Login successful")?))
}

/// Sessions are stateless tokens; logout is an acknowledgement the client
/// pairs with discarding its token. Safe to call repeatedly.
#[instrument]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: "Logged out successfully".into(),
    })
}

#[instrument(skip(session))]
pub async fn session(session: Option<AuthUser>) -> Json<SessionResponse> {
    match session {
        Some(AuthUser(session)) => Json(SessionResponse {
            authenticated: true,
            user: Some(PublicUser {
                name: session.name,
                email: session.email,
            }),
        }),
        None => Json(SessionResponse {
            authenticated: false,
            user: None,
        }),
    }
}

fn last_four(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ResetStartedResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email format".into()));
    }

    let Some(user) = User::find(&state.store, &payload.email).await else {
        warn!(email = %payload.email, "reset requested for unknown email");
        return Err(ApiError::NotFound("Email not found".into()));
    };

    let code = generate_reset_code();
    let record = ResetCode {
        code: code.clone(),
        expires_at: OffsetDateTime::now_utc() + Duration::minutes(RESET_CODE_TTL_MINUTES),
        phone: user.phone.clone(),
    };
    ResetCode::put(&state.store, &payload.email, record)
        .await
        .map_err(ApiError::Storage)?;

    let body = format!(
        "Hello,\n\n\
         Your password reset code is: {code}\n\n\
         This code will expire in {RESET_CODE_TTL_MINUTES} minutes.\n\n\
         If you didn't request this, please ignore this email.\n"
    );
    let sent = state
        .mailer
        .send(&payload.email, "Password Reset Code", &body)
        .await;
    if !sent {
        return Err(ApiError::Delivery("Failed to send the reset code".into()));
    }

    info!(email = %payload.email, "reset code issued");
    Ok(Json(ResetStartedResponse {
        success: true,
        message: "Reset code sent to your email".into(),
        phone_hint: last_four(&user.phone),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_reset(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.code = payload.code.trim().to_string();

    if payload.email.is_empty() || payload.code.is_empty() || payload.new_password.is_empty() {
        return Err(ApiError::Validation("All fields are required".into()));
    }
    if payload.new_password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    let Some(record) = ResetCode::find(&state.store, &payload.email).await else {
        return Err(ApiError::NotFound(
            "No reset code found for this email".into(),
        ));
    };

    if OffsetDateTime::now_utc() >= record.expires_at {
        ResetCode::purge(&state.store, &payload.email)
            .await
            .map_err(ApiError::Storage)?;
        warn!(email = %payload.email, "reset code expired");
        return Err(ApiError::Validation("Reset code has expired".into()));
    }

    if record.code != payload.code {
        warn!(email = %payload.email, "reset code mismatch");
        return Err(ApiError::Validation("Invalid reset code".into()));
    }

    let hash = hash_password(&payload.new_password).map_err(ApiError::Internal)?;
    let updated = User::set_password(&state.store, &payload.email, &hash)
        .await
        .map_err(ApiError::Storage)?;
    if !updated {
        return Err(ApiError::NotFound("Email not found".into()));
    }

    ResetCode::purge(&state.store, &payload.email)
        .await
        .map_err(ApiError::Storage)?;

    info!(email = %payload.email, "password reset");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset successful".into(),
    }))
}
