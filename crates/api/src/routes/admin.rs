//! Account moderation. Administrators only.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, post},
};
use potluck_shared::types::UserId;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiResult, forbidden, map_ledger_error};
use crate::responses::UserResponse;
use crate::{AppState, middleware::AuthUser};

/// Creates the admin router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/{user_id}/ban", post(ban_user))
        .route("/admin/users/{user_id}/unban", post(unban_user))
        .route("/admin/users/{user_id}", delete(delete_user))
}

async fn set_banned(state: &AppState, auth: &AuthUser, user_id: Uuid, banned: bool) -> ApiResult {
    auth.ensure_admin()?;
    let user_id = UserId::from_uuid(user_id);
    if banned && user_id == auth.user_id() {
        return Err(forbidden("administrators cannot ban themselves"));
    }

    let user = state
        .users()
        .set_banned(user_id, banned)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    info!(admin_id = %auth.user_id(), user_id = %user.id, banned, "Moderation applied");
    Ok(Json(UserResponse::from(user)).into_response())
}

/// POST /admin/users/{user_id}/ban
async fn ban_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult {
    set_banned(&state, &auth, user_id, true).await
}

/// POST /admin/users/{user_id}/unban
async fn unban_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult {
    set_banned(&state, &auth, user_id, false).await
}

/// DELETE /admin/users/{user_id} - Deactivate an account with no open obligations.
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult {
    auth.ensure_admin()?;
    state
        .users()
        .delete(UserId::from_uuid(user_id), &state.locks)
        .await
        .map_err(|e| map_ledger_error(&e))?;

    info!(admin_id = %auth.user_id(), user_id = %user_id, "User deleted");
    Ok(Json(json!({ "message": "User deleted" })).into_response())
}
