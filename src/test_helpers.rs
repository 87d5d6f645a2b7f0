use axum::Router;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

use crate::{config::AppConfig, routes::app, state::AppState};

/// The full application over a connection, usually a prepared `MockDatabase`.
pub fn test_router(db: DatabaseConnection) -> Router {
    app(AppState::new(AppConfig::default(), db))
}

/// The full application over a mock that has no prepared results.
pub fn empty_test_router() -> Router {
    test_router(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}
