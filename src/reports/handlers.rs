use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::instrument;

use crate::{
    auth::services::AuthUser,
    ledger::repo::{self, Budget, Transaction, BUDGETS, TRANSACTIONS},
    state::AppState,
};

use super::service::{self, BudgetStatus, MonthTrend, Summary};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/reports", get(get_reports))
        .route("/budgets/status", get(get_budget_status))
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub success: bool,
    pub income: f64,
    pub expenses: f64,
    pub categories: BTreeMap<String, f64>,
    pub monthly_trend: Vec<MonthTrend>,
}

#[instrument(skip(state, session))]
pub async fn get_summary(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Json<SummaryResponse> {
    let transactions: Vec<Transaction> =
        repo::entries(&state.store, TRANSACTIONS, &session.email).await;
    Json(SummaryResponse {
        success: true,
        summary: service::summarize(&transactions),
    })
}

#[instrument(skip(state, session))]
pub async fn get_reports(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Json<ReportsResponse> {
    let transactions: Vec<Transaction> =
        repo::entries(&state.store, TRANSACTIONS, &session.email).await;
    let summary = service::summarize(&transactions);
    let today = OffsetDateTime::now_utc().date();
    Json(ReportsResponse {
        success: true,
        income: summary.income,
        expenses: summary.expenses,
        categories: service::category_totals(&transactions),
        monthly_trend: service::monthly_trend(&transactions, today),
    })
}

#[instrument(skip(state, session))]
pub async fn get_budget_status(
    State(state): State<AppState>,
    AuthUser(session): AuthUser,
) -> Json<Vec<BudgetStatus>> {
    let transactions: Vec<Transaction> =
        repo::entries(&state.store, TRANSACTIONS, &session.email).await;
    let budgets: Vec<Budget> = repo::entries(&state.store, BUDGETS, &session.email).await;
    Json(service::budget_status(&budgets, &transactions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::services::Session;
    use crate::ledger::repo::TransactionKind;

    fn session() -> AuthUser {
        AuthUser(Session {
            email: "alice@example.com".into(),
            name: "Alice".into(),
        })
    }

    async fn state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::fake(dir.path());
        state.store.init().await.unwrap();
        (dir, state)
    }

    async fn seed_transaction(state: &AppState, kind: TransactionKind, amount: f64, category: &str) {
        repo::append(&state.store, TRANSACTIONS, "alice@example.com", |id| {
            Transaction {
                id,
                kind,
                amount,
                category: category.into(),
                description: String::new(),
                date: OffsetDateTime::now_utc().date(),
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn summary_over_no_transactions_is_zero() {
        let (_dir, state) = state().await;
        let res = get_summary(State(state.clone()), session()).await;
        assert_eq!(res.0.summary, Summary::default());
    }

    #[tokio::test]
    async fn summary_reflects_recorded_transactions() {
        let (_dir, state) = state().await;
        seed_transaction(&state, TransactionKind::Income, 1000.0, "").await;
        seed_transaction(&state, TransactionKind::Expense, 250.0, "food").await;

        let res = get_summary(State(state.clone()), session()).await;
        assert_eq!(res.0.summary.income, 1000.0);
        assert_eq!(res.0.summary.expenses, 250.0);
        assert_eq!(res.0.summary.balance, 750.0);
        assert_eq!(res.0.summary.transaction_count, 2);
    }

    #[tokio::test]
    async fn budget_status_reports_overspend() {
        let (_dir, state) = state().await;
        seed_transaction(&state, TransactionKind::Expense, 250.0, "food").await;
        let month = service::month_token(OffsetDateTime::now_utc().date());
        repo::append_budget(&state.store, "alice@example.com", "food", 200.0, &month)
            .await
            .unwrap();

        let res = get_budget_status(State(state.clone()), session()).await;
        assert_eq!(res.0.len(), 1);
        assert_eq!(res.0[0].spent, 250.0);
        assert_eq!(res.0[0].remaining, -50.0);
    }

    #[tokio::test]
    async fn reports_cover_six_months_ending_now() {
        let (_dir, state) = state().await;
        seed_transaction(&state, TransactionKind::Expense, 30.0, "food").await;
        seed_transaction(&state, TransactionKind::Expense, 12.0, "travel").await;

        let res = get_reports(State(state.clone()), session()).await;
        assert_eq!(res.0.monthly_trend.len(), 6);
        let today = OffsetDateTime::now_utc().date();
        assert_eq!(
            res.0.monthly_trend.last().unwrap().month,
            service::month_token(today)
        );
        assert_eq!(res.0.categories["food"], 30.0);
        assert_eq!(res.0.categories["travel"], 12.0);
        assert_eq!(res.0.expenses, 42.0);
    }

    #[test]
    fn summary_response_flattens_the_summary() {
        let json = serde_json::to_value(SummaryResponse {
            success: true,
            summary: Summary {
                income: 1.0,
                expenses: 2.0,
                balance: -1.0,
                transaction_count: 2,
            },
        })
        .unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["income"], 1.0);
        assert_eq!(json["transaction_count"], 2);
    }
}
