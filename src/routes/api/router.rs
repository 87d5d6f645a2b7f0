use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{health, projects, sql};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(sql::router())
        .merge(projects::router(state))
}
