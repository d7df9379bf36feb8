//! API route definitions.

use axum::{Router, middleware};
use potluck_shared::types::Money;
use rust_decimal::Decimal;

use crate::error::validation_error;
use crate::{AppState, middleware::auth::auth_middleware};

pub mod actions;
pub mod admin;
pub mod auth;
pub mod categories;
pub mod debts;
pub mod expenses;
pub mod groups;
pub mod health;
pub mod users;
pub mod wallet;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(users::routes())
        .merge(groups::routes())
        .merge(expenses::routes())
        .merge(debts::routes())
        .merge(wallet::routes())
        .merge(actions::routes())
        .merge(admin::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(categories::routes())
        .merge(protected_routes)
}

/// Converts a request amount to minor units, rejecting sub-cent precision.
pub(crate) fn parse_amount(
    amount: Decimal,
    field: &str,
) -> Result<Money, axum::response::Response> {
    Money::from_decimal(amount).map_err(|e| validation_error(format!("{field}: {e}")))
}
