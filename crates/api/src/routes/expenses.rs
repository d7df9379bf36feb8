//! Expense routes.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use potluck_core::voting::{ActionDetails, ExpensePayer};
use potluck_shared::types::{GroupId, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiResult, map_ledger_error, validation_error};
use crate::responses::ExpenseResponse;
use crate::routes::{actions::propose, parse_amount};
use crate::{AppState, middleware::AuthUser};

/// Expense proposal body.
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    /// What was bought.
    pub description: String,
    /// Amount spent.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Group the expense belongs to.
    pub group_id: Uuid,
    /// Users sharing the expense.
    pub participant_ids: Vec<Uuid>,
    /// Category name.
    pub category_name: String,
    /// Paying member; defaults to the caller.
    pub paid_by_user_id: Option<Uuid>,
    /// Pay from the group wallet instead of a member's pocket.
    #[serde(default)]
    pub paid_from_wallet: bool,
}

/// Optional group filter shared by the listing routes.
#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    /// Restrict to one group.
    pub group_id: Option<Uuid>,
}

/// Creates the expenses router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/expenses", get(list_expenses).post(create_expense))
}

/// POST /expenses - Propose a shared expense. Answers 202 with the pending action.
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ExpenseRequest>,
) -> ApiResult {
    let total = parse_amount(payload.total_amount, "total_amount")?;

    let payer = if payload.paid_from_wallet {
        if payload.paid_by_user_id.is_some() {
            return Err(validation_error(
                "paid_by_user_id cannot be combined with paid_from_wallet",
            ));
        }
        ExpensePayer::Wallet
    } else {
        let user_id = payload
            .paid_by_user_id
            .map_or(auth.user_id(), UserId::from_uuid);
        ExpensePayer::Member { user_id }
    };

    let participants: Vec<UserId> = payload
        .participant_ids
        .into_iter()
        .map(UserId::from_uuid)
        .collect();
    let details = ActionDetails::expense(
        &payload.description,
        total,
        &participants,
        &payload.category_name,
        payer,
    )
    .map_err(|e| map_ledger_error(&e))?;

    propose(
        &state,
        GroupId::from_uuid(payload.group_id),
        auth.user_id(),
        details,
    )
    .await
}

/// GET /expenses - Confirmed expenses in the caller's groups.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<GroupQuery>,
) -> ApiResult {
    let scope = state
        .groups()
        .scope(auth.user_id(), query.group_id.map(GroupId::from_uuid))
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let expenses = state
        .expenses()
        .list(&scope)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<ExpenseResponse> = expenses.into_iter().map(ExpenseResponse::from).collect();
    Ok(Json(body).into_response())
}
