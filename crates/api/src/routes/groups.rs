//! Group routes: creation, lookup, membership proposals and settlement plans.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use potluck_core::voting::ActionDetails;
use potluck_shared::types::{GroupId, UserId};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiResult, map_ledger_error};
use crate::responses::{BalanceSummaryResponse, GroupResponse};
use crate::routes::actions::propose;
use crate::{AppState, middleware::AuthUser};

/// Group creation body.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    /// Group name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
}

/// Creates the groups router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group))
        .route("/groups/{group_id}", get(get_group))
        .route(
            "/groups/{group_id}/add_member/{user_id}",
            post(add_member),
        )
        .route(
            "/groups/{group_id}/remove_member/{user_id}",
            delete(remove_member),
        )
        .route("/groups/{group_id}/settlement-plan", get(settlement_plan))
}

/// POST /groups - Create a group owned by the caller.
async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> ApiResult {
    let group = state
        .groups()
        .create(
            auth.user_id(),
            &payload.name,
            payload.description.as_deref(),
        )
        .await
        .map_err(|e| map_ledger_error(&e))?;

    info!(group_id = %group.group.id, owner_id = %auth.user_id(), "Group created");
    Ok((StatusCode::CREATED, Json(GroupResponse::from(group))).into_response())
}

/// GET /groups/{group_id} - Members and administrators only.
async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<Uuid>,
) -> ApiResult {
    let group_id = GroupId::from_uuid(group_id);
    let groups = state.groups();
    let group = if auth.is_admin() {
        groups.find(group_id).await
    } else {
        groups.find_for_member(group_id, auth.user_id()).await
    }
    .map_err(|e| map_ledger_error(&e))?;
    Ok(Json(GroupResponse::from(group)).into_response())
}

/// POST /groups/{group_id}/add_member/{user_id} - Propose adding a user.
async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    propose(
        &state,
        GroupId::from_uuid(group_id),
        auth.user_id(),
        ActionDetails::member_add(UserId::from_uuid(user_id)),
    )
    .await
}

/// DELETE /groups/{group_id}/remove_member/{user_id} - Propose removing a member.
async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult {
    propose(
        &state,
        GroupId::from_uuid(group_id),
        auth.user_id(),
        ActionDetails::member_remove(UserId::from_uuid(user_id)),
    )
    .await
}

/// GET /groups/{group_id}/settlement-plan - Minimal transfers clearing the group's debts.
async fn settlement_plan(
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

    let lines = state
        .debts()
        .settlement_plan(group_id)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<BalanceSummaryResponse> =
        lines.into_iter().map(BalanceSummaryResponse::from).collect();
    Ok(Json(body).into_response())
}
