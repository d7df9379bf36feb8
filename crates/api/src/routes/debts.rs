//! Debt history and balance summary routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use potluck_shared::types::GroupId;

use crate::error::{ApiResult, map_ledger_error};
use crate::responses::{BalanceSummaryResponse, DebtResponse};
use crate::routes::expenses::GroupQuery;
use crate::{AppState, middleware::AuthUser};

/// Creates the debts router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/debts/history", get(debt_history))
        .route("/balance-summary", get(balance_summary))
}

/// GET /debts/history - Every debt in the caller's groups with its payments.
async fn debt_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GroupQuery>,
) -> ApiResult {
    let scope = state
        .groups()
        .scope(auth.user_id(), query.group_id.map(GroupId::from_uuid))
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let debts = state
        .debts()
        .history(&scope)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<DebtResponse> = debts.into_iter().map(DebtResponse::from).collect();
    Ok(Json(body).into_response())
}

/// GET /balance-summary - Net amounts owed between pairs of users.
async fn balance_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GroupQuery>,
) -> ApiResult {
    let scope = state
        .groups()
        .scope(auth.user_id(), query.group_id.map(GroupId::from_uuid))
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let lines = state
        .debts()
        .balance_summary(&scope)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<BalanceSummaryResponse> =
        lines.into_iter().map(BalanceSummaryResponse::from).collect();
    Ok(Json(body).into_response())
}
