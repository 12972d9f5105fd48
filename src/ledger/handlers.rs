use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::services::AuthUser,
    error::ApiError,
    reports::service::{month_token, parse_month_token},
    state::AppState,
};

use super::dto::{Deleted, NewBudget, NewTransaction};
use super::repo::{self, Budget, Transaction, DAY_FORMAT, BUDGETS, TRANSACTIONS};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/:id", delete(delete_transaction))
        .route("/budgets", get(list_budgets).post(create_budget))
        .route("/budgets/:id", delete(delete_budget))
}

#[instrument(skip(state, session))]
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Json<Vec<Transaction>> {
    Json(repo::entries(&state.store, TRANSACTIONS, &session.email).await)
}

#[instrument(skip(state, session, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(payload): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    // Stored amounts are magnitudes; the sign lives in the type.
    let amount = payload.amount.abs();
    if !(amount > 0.0) {
        warn!(amount = payload.amount, "rejected transaction amount");
        return Err(ApiError::Validation("Invalid amount".into()));
    }

    let date = match &payload.date {
        Some(raw) => time::Date::parse(raw, DAY_FORMAT)
            .map_err(|_| ApiError::Validation("Invalid date, expected YYYY-MM-DD".into()))?,
        None => OffsetDateTime::now_utc().date(),
    };

    let transaction = repo::append(&state.store, TRANSACTIONS, &session.email, |id| {
        Transaction {
            id,
            kind: payload.kind,
            amount,
            category: payload.category.trim().to_string(),
            description: payload.description.trim().to_string(),
            date,
        }
    })
    .await
    .map_err(ApiError::Storage)?;

    info!(email = %session.email, id = transaction.id, "transaction recorded");
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[instrument(skip(state, session))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<Deleted>, ApiError> {
    let removed = repo::remove::<Transaction>(&state.store, TRANSACTIONS, &session.email, id)
        .await
        .map_err(ApiError::Storage)?;
    if !removed {
        return Err(ApiError::NotFound("Transaction not found".into()));
    }
    info!(email = %session.email, id, "transaction deleted");
    Ok(Json(Deleted {
        success: true,
        message: "Transaction deleted successfully".into(),
    }))
}

#[instrument(skip(state, session))]
pub async fn list_budgets(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Json<Vec<Budget>> {
    Json(repo::entries(&state.store, BUDGETS, &session.email).await)
}

#[instrument(skip(state, session, payload))]
pub async fn create_budget(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Json(payload): Json<NewBudget>,
) -> Result<(StatusCode, Json<Budget>), ApiError> {
    if !(payload.limit > 0.0) {
        warn!(limit = payload.limit, "rejected budget limit");
        return Err(ApiError::Validation("Invalid budget limit".into()));
    }
    let category = payload.category.trim().to_string();
    if category.is_empty() {
        return Err(ApiError::Validation("Category is required".into()));
    }

    let month = match &payload.month {
        Some(raw) => {
            let raw = raw.trim();
            if parse_month_token(raw).is_none() {
                return Err(ApiError::Validation(
                    "Invalid month, expected YYYY-MM".into(),
                ));
            }
            raw.to_string()
        }
        None => month_token(OffsetDateTime::now_utc().date()),
    };

    let budget = repo::append_budget(&state.store, &session.email, &category, payload.limit, &month)
        .await
        .map_err(ApiError::Storage)?
        .ok_or_else(|| {
            ApiError::Conflict("A budget for this category and month already exists".into())
        })?;

    info!(email = %session.email, id = budget.id, "budget created");
    Ok((StatusCode::CREATED, Json(budget)))
}

#[instrument(skip(state, session))]
pub async fn delete_budget(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
    Path(id): Path<u64>,
) -> Result<Json<Deleted>, ApiError> {
    let removed = repo::remove::<Budget>(&state.store, BUDGETS, &session.email, id)
        .await
        .map_err(ApiError::Storage)?;
    if !removed {
        return Err(ApiError::NotFound("Budget not found".into()));
    }
    info!(email = %session.email, id, "budget deleted");
    Ok(Json(Deleted {
        success: true,
        message: "Budget deleted successfully".into(),
    }))
}
