use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-level failure. Every handler returns this; no failure is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input. The message is shown to the client.
    #[error("{0}")]
    Validation(String),

    /// No valid session on a protected operation.
    #[error("Please login first")]
    Unauthorized,

    /// Unknown email or wrong password. One message for both, so the
    /// response does not reveal which factor failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The delegated identity provider rejected the exchange.
    #[error("Google authentication failed")]
    ProviderAuth,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Best-effort external delivery did not complete.
    #[error("{0}")]
    Delivery(String),

    /// I/O failure in the record store. Details go to the log only.
    #[error("Server error")]
    Storage(anyhow::Error),

    #[error("Server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials | ApiError::ProviderAuth => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Delivery(_) | ApiError::Storage(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Storage(e) => error!(error = %format!("{e:#}"), "storage failure"),
            ApiError::Internal(e) => error!(error = %format!("{e:#}"), "internal failure"),
            _ => {}
        }
        let status = self.status();
        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("missing".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("dup".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Storage(anyhow::anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_errors_do_not_leak_detail() {
        let err = ApiError::Storage(anyhow::anyhow!("open /data/users.json: permission denied"));
        assert_eq!(err.to_string(), "Server error");
    }

    #[test]
    fn credential_failures_share_one_message() {
        assert_eq!(
            ApiError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
    }
}
