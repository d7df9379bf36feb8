//! User directory routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use potluck_shared::types::{PageRequest, UserId};
use uuid::Uuid;

use crate::error::{ApiResult, forbidden, map_ledger_error};
use crate::responses::{GroupResponse, UserResponse};
use crate::{AppState, middleware::AuthUser};

/// Creates the users router (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{user_id}", get(get_user))
        .route("/users/{user_id}/groups", get(user_groups))
}

/// GET /users - Page through registered users.
async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> ApiResult {
    let users = state
        .users()
        .list(page)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(body).into_response())
}

/// GET /users/{user_id}
async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult {
    let user = state
        .users()
        .find_by_id(UserId::from_uuid(user_id))
        .await
        .map_err(|e| map_ledger_error(&e))?;
    Ok(Json(UserResponse::from(user)).into_response())
}

/// GET /users/{user_id}/groups - Groups a user belongs to. Self or admin only.
async fn user_groups(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult {
    let user_id = UserId::from_uuid(user_id);
    if user_id != auth.user_id() && !auth.is_admin() {
        return Err(forbidden("cannot list another user's groups"));
    }

    let groups = state
        .groups()
        .list_for(user_id)
        .await
        .map_err(|e| map_ledger_error(&e))?;
    let body: Vec<GroupResponse> = groups.into_iter().map(GroupResponse::from).collect();
    Ok(Json(body).into_response())
}
