//! Pending-action routes: the voting inbox, lookups and votes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use potluck_core::voting::ActionDetails;
use potluck_db::repositories::ActionView;
use potluck_shared::types::{ActionId, GroupId, UserId};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiResult, forbidden, map_ledger_error};
use crate::responses::PendingActionResponse;
use crate::{AppState, middleware::AuthUser};

/// Query for the voting inbox.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    /// Whose inbox; defaults to the caller.
    pub user_id: Option<Uuid>,
}

/// Vote body.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// Must be the authenticated user.
    pub voter_id: Uuid,
    /// Approve or reject.
    pub approve: bool,
}

/// Creates the actions router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/actions/pending", get(pending_actions))
        .route("/actions/{action_id}", get(get_action))
        .route("/actions/{action_id}/vote", post(vote))
}

/// Proposes an action and answers 202 with it.
///
/// Actions that resolve on the spot (a one-member group) are announced as
/// resolved rather than proposed.
pub(crate) async fn propose(
    state: &AppState,
    group_id: GroupId,
    initiator: UserId,
    details: ActionDetails,
) -> ApiResult {
    let view = state
        .actions()
        .propose(group_id, initiator, details)
        .await
        .map_err(|e| map_ledger_error(&e))?;

    let event = view.event();
    if view.status().is_terminal() {
        state.notifier.action_resolved(&event).await;
    } else {
        state.notifier.action_proposed(&event).await;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(PendingActionResponse::from(view)),
    )
        .into_response())
}

fn render(view: ActionView) -> ApiResult {
    Ok(Json(PendingActionResponse::from(view)).into_response())
}

/// GET /actions/pending - Actions the user may still vote on.
async fn pending_actions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PendingQuery>,
) -> ApiResult {
    let user_id = query.user_id.map_or(auth.user_id(), UserId::from_uuid);
    if user_id != auth.user_id() && !auth.is_admin() {
        return Err(forbidden("cannot read another user's voting inbox"));
    }

    let views = state
        .actions()
        .awaiting_vote(user_id)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<PendingActionResponse> =
        views.into_iter().map(PendingActionResponse::from).collect();
    Ok(Json(body).into_response())
}

/// GET /actions/{action_id}
async fn get_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(action_id): Path<Uuid>,
) -> ApiResult {
    let action_id = ActionId::from_uuid(action_id);
    let actions = state.actions();
    let view = if auth.is_admin() {
        actions.find(action_id).await
    } else {
        actions.find_for_member(action_id, auth.user_id()).await
    }
    .map_err(|e| map_ledger_error(&e))?;
    render(view)
}

/// POST /actions/{action_id}/vote - Cast the caller's vote.
async fn vote(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(action_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> ApiResult {
    let voter = UserId::from_uuid(payload.voter_id);
    auth.ensure_self(voter, "voter_id")?;

    let view = state
        .actions()
        .vote(ActionId::from_uuid(action_id), voter, payload.approve)
        .await
        .map_err(|e| map_ledger_error(&e))?;

    info!(
        action_id = %action_id,
        voter_id = %voter,
        approve = payload.approve,
        status = %view.status(),
        "Vote cast"
    );
    if view.status().is_terminal() {
        state.notifier.action_resolved(&view.event()).await;
    }
    render(view)
}
