//! Group wallet routes: deposits, withdrawals, settlement, balances and the log.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use potluck_core::voting::ActionDetails;
use potluck_core::wallet::SettlementScope;
use potluck_shared::types::{DebtId, GroupId, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiResult, map_ledger_error, validation_error};
use crate::responses::{SettlementSummary, WalletBalanceResponse, WalletTransactionResponse};
use crate::routes::{actions::propose, parse_amount};
use crate::{AppState, middleware::AuthUser};

/// Deposit body.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Member credited; must be the caller.
    pub user_id: Uuid,
    /// Amount to deposit.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Note.
    pub description: Option<String>,
}

/// Withdrawal body.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// Member withdrawing; must be the caller.
    pub user_id: Uuid,
    /// Amount to withdraw.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// The caller's password, checked again.
    pub password: String,
}

/// Settlement body. With neither id every member's debts are swept.
#[derive(Debug, Default, Deserialize)]
pub struct SettleRequest {
    /// Settle this debtor's debts.
    pub user_id: Option<Uuid>,
    /// Settle this debt only.
    pub debt_id: Option<Uuid>,
    /// Cap on the amount paid; only with `user_id` or `debt_id`.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
}

/// Creates the wallet router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups/{group_id}/wallet/deposit", post(deposit))
        .route("/groups/{group_id}/wallet/withdraw", post(withdraw))
        .route("/groups/{group_id}/wallet/settle-debts", post(settle_debts))
        .route("/groups/{group_id}/wallet/balance", get(balance))
        .route("/groups/{group_id}/wallet/transactions", get(transactions))
}

/// POST /groups/{group_id}/wallet/deposit - Propose a deposit. Answers 202.
async fn deposit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<DepositRequest>,
) -> ApiResult {
    let user_id = UserId::from_uuid(payload.user_id);
    auth.ensure_self(user_id, "user_id")?;
    let amount = parse_amount(payload.amount, "amount")?;

    let details = ActionDetails::wallet_deposit(user_id, amount, payload.description.as_deref())
        .map_err(|e| map_ledger_error(&e))?;
    propose(&state, GroupId::from_uuid(group_id), user_id, details).await
}

/// POST /groups/{group_id}/wallet/withdraw - Take money out of the caller's balance.
async fn withdraw(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<WithdrawRequest>,
) -> ApiResult {
    let user_id = UserId::from_uuid(payload.user_id);
    auth.ensure_self(user_id, "user_id")?;
    let amount = parse_amount(payload.amount, "amount")?;
    let group_id = GroupId::from_uuid(group_id);

    let wallet = state.wallet();
    wallet
        .withdraw(group_id, user_id, amount, &payload.password)
        .await
        .map_err(|e| map_ledger_error(&e))?;

    let balance = wallet
        .balance(group_id)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    Ok(Json(WalletBalanceResponse::from(balance)).into_response())
}

/// POST /groups/{group_id}/wallet/settle-debts - Pay debts from wallet balances.
async fn settle_debts(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<SettleRequest>,
) -> ApiResult {
    let amount = payload
        .amount
        .map(|a| parse_amount(a, "amount"))
        .transpose()?;

    let scope = match (payload.debt_id, payload.user_id) {
        (Some(_), Some(_)) => {
            return Err(validation_error("give either debt_id or user_id, not both"));
        }
        (Some(debt_id), None) => SettlementScope::Debt {
            debt_id: DebtId::from_uuid(debt_id),
            amount,
        },
        (None, Some(user_id)) => SettlementScope::Debtor {
            user_id: UserId::from_uuid(user_id),
            amount,
        },
        (None, None) if amount.is_some() => {
            return Err(validation_error(
                "amount requires debt_id or user_id",
            ));
        }
        (None, None) => SettlementScope::Group,
    };

    let outcome = state
        .wallet()
        .settle(GroupId::from_uuid(group_id), auth.user_id(), scope)
        .await
        .map_err(|e| map_ledger_error(&e))?;

    info!(
        group_id = %group_id,
        actor_id = %auth.user_id(),
        debts = outcome.logs.len(),
        total_settled = %outcome.total_settled,
        "Settlement run"
    );
    Ok(Json(SettlementSummary::from(outcome)).into_response())
}

/// GET /groups/{group_id}/wallet/balance
async fn balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult {
    let group_id = GroupId::from_uuid(group_id);
    if !auth.is_admin() {
        state
            .groups()
            .require_member(group_id, auth.user_id())
            .await
            .map_err(|e| map_ledger_error(&e))?;
    }
    let balance = state
        .wallet()
        .balance(group_id)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    Ok(Json(WalletBalanceResponse::from(balance)).into_response())
}

/// GET /groups/{group_id}/wallet/transactions - The wallet log, newest first.
async fn transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult {
    let group_id = GroupId::from_uuid(group_id);
    if !auth.is_admin() {
        state
            .groups()
            .require_member(group_id, auth.user_id())
            .await
            .map_err(|e| map_ledger_error(&e))?;
    }
    let rows = state
        .wallet()
        .transactions(group_id)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<WalletTransactionResponse> = rows
        .into_iter()
        .map(WalletTransactionResponse::from)
        .collect();
    Ok(Json(body).into_response())
}
