//! Authentication routes for register, login, and token refresh.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use potluck_core::auth::{PasswordError, SystemRole, hash_password, verify_password};
use potluck_db::entities::users;
use potluck_db::repositories::NewUser;
use potluck_shared::{AppError, TokenKind, TokenPair};
use potluck_shared::types::{PageRequest, UserId};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::AppState;
use crate::error::{ApiResult, error_response, map_app_error, map_ledger_error, validation_error};
use crate::responses::UserResponse;

/// Registration body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Plain-text password.
    pub password: String,
}

/// Login body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Refresh body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// A refresh token issued by login.
    pub refresh_token: String,
}

/// Tokens plus the authenticated user.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Bearer tokens.
    #[serde(flatten)]
    pub tokens: TokenPair,
    /// The user the tokens belong to.
    pub user: UserResponse,
}

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn invalid_credentials() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "invalid_credentials",
        "Invalid username or password",
    )
}

fn account_disabled() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "account_disabled",
        "This account has been disabled",
    )
}

/// Issues an access and refresh token for `user`.
fn issue_tokens(state: &AppState, user: users::Model) -> ApiResult {
    let role = SystemRole::from(user.role);
    let tokens = state
        .jwt_service
        .issue_pair(user.id, role.as_str())
        .map_err(|e| map_app_error(&AppError::from(e)))?;

    Ok(Json(TokenResponse {
        tokens,
        user: user.into(),
    })
    .into_response())
}

/// POST /auth/register - Create an account.
///
/// The first account registered on an empty ledger becomes the administrator.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult {
    let password_hash = hash_password(&payload.password).map_err(|e| match e {
        PasswordError::TooShort => validation_error(e.to_string()),
        _ => map_app_error(&AppError::Internal(e.to_string())),
    })?;

    let users = state.users();
    let first = users
        .list(PageRequest { skip: 0, limit: 1 })
        .await
        .map_err(|e| map_ledger_error(&e))?
        .is_empty();
    let role = if first {
        SystemRole::Admin
    } else {
        SystemRole::User
    };

    let user = users
        .create(NewUser {
            username: payload.username,
            name: payload.name,
            password_hash,
            role: role.into(),
        })
        .await
        .map_err(|e| map_ledger_error(&e))?;

    info!(user_id = %user.id, username = %user.username, role = %role, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))).into_response())
}

/// POST /auth/login - Authenticate and return tokens.
async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> ApiResult {
    let username = payload.username.trim().to_lowercase();
    let Some(user) = state
        .users()
        .find_by_username(&username)
        .await
        .map_err(|e| map_ledger_error(&e))?
    else {
        info!(username = %username, "Login attempt for unknown user");
        return Err(invalid_credentials());
    };

    if !user.is_active || user.is_banned {
        return Err(account_disabled());
    }

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "Failed login attempt - invalid password");
            return Err(invalid_credentials());
        }
        Err(e) => {
            error!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
            return Err(map_app_error(&AppError::Internal(e.to_string())));
        }
    }

    info!(user_id = %user.id, "User logged in");
    issue_tokens(&state, user)
}

/// POST /auth/refresh - Exchange a refresh token for a new pair.
async fn refresh(State(state): State<AppState>, Json(payload): Json<RefreshRequest>) -> ApiResult {
    let claims = state
        .jwt_service
        .verify(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|_| {
            error_response(
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid or expired refresh token",
            )
        })?;

    let user = state
        .users()
        .find_by_id(UserId::from_uuid(claims.user_id()))
        .await
        .map_err(|e| map_ledger_error(&e))?;
    if !user.is_active || user.is_banned {
        return Err(account_disabled());
    }

    issue_tokens(&state, user)
}
