use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    auth::services::AuthUser,
    error::ApiError,
    ledger::repo::{self, Budget, Transaction, BUDGETS, TRANSACTIONS},
    reports::service,
    state::AppState,
};

use super::prompt::{build_prompt, FALLBACK, SYSTEM_INSTRUCTION, UNCONFIGURED};

pub fn routes() -> Router<AppState> {
    Router::new().route("/advice", post(get_advice))
}

#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    pub success: bool,
    pub advice: String,
}

#[instrument(skip(state, session, payload))]
pub async fn get_advice(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(payload): Json<AdviceRequest>,
) -> Result<Json<AdviceResponse>, ApiError> {
    let question = payload.query.trim();
    if question.is_empty() {
        return Err(ApiError::Validation("Please enter a question".into()));
    }

    let transactions: Vec<Transaction> =
        repo::entries(&state.store, TRANSACTIONS, &session.email).await;
    let budgets: Vec<Budget> = repo::entries(&state.store, BUDGETS, &session.email).await;
    let summary = service::summarize(&transactions);
    let status = service::budget_status(&budgets, &transactions);
    let prompt = build_prompt(&summary, &status, question);

    if state.config.advisor.api_key.is_none() {
        return Ok(Json(AdviceResponse {
            success: true,
            advice: UNCONFIGURED.into(),
        }));
    }

    let advice = match state.advisor.complete(SYSTEM_INSTRUCTION, &prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "completion failed, serving fallback");
            FALLBACK.to_string()
        }
    };

    Ok(Json(AdviceResponse {
        success: true,
        advice,
    }))
}
