//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - Authentication middleware
//! - Response types
//! - A log-backed notifier for action events

pub mod error;
pub mod middleware;
pub mod notify;
pub mod responses;
pub mod routes;

use axum::Router;
use potluck_core::notify::Notifier;
use potluck_db::{
    ActionRepository, CategoryRepository, DebtRepository, ExpenseRepository, GroupRepository,
    LockRegistry, UserRepository, WalletRepository,
};
use potluck_shared::JwtService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Per-aggregate locks shared by every repository.
    pub locks: LockRegistry,
    /// Where action proposals and resolutions are announced.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Creates the state with a fresh lock registry.
    pub fn new(
        db: DatabaseConnection,
        jwt_service: JwtService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            jwt_service: Arc::new(jwt_service),
            locks: LockRegistry::new(),
            notifier,
        }
    }

    pub(crate) fn users(&self) -> UserRepository {
        UserRepository::new((*self.db).clone())
    }

    pub(crate) fn groups(&self) -> GroupRepository {
        GroupRepository::new((*self.db).clone())
    }

    pub(crate) fn categories(&self) -> CategoryRepository {
        CategoryRepository::new((*self.db).clone())
    }

    pub(crate) fn actions(&self) -> ActionRepository {
        ActionRepository::new((*self.db).clone(), self.locks.clone())
    }

    pub(crate) fn wallet(&self) -> WalletRepository {
        WalletRepository::new((*self.db).clone(), self.locks.clone())
    }

    pub(crate) fn debts(&self) -> DebtRepository {
        DebtRepository::new((*self.db).clone())
    }

    pub(crate) fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new((*self.db).clone())
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
