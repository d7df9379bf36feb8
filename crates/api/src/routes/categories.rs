//! Expense category listing.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::AppState;
use crate::error::{ApiResult, map_ledger_error};
use crate::responses::CategoryResponse;

/// Creates the categories router. Public.
pub fn routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

async fn list_categories(State(state): State<AppState>) -> ApiResult {
    let categories = state
        .categories()
        .list()
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<CategoryResponse> = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(Json(body).into_response())
}
