use crate::state::AppState;
use axum::Router;

pub mod client;
pub mod handlers;
pub mod prompt;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
