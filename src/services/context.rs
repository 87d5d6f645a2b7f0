use sea_orm::DatabaseConnection;

use crate::{
    config::DesignerConfig,
    db::dao::DaoContext,
    services::{locks::ProjectLocks, project_service::ProjectService},
    state::AppState,
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
    limits: DesignerConfig,
    locks: ProjectLocks,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            daos: DaoContext::new(db),
            limits: DesignerConfig::default(),
            locks: ProjectLocks::new(),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self {
            daos: DaoContext::new(&state.db),
            limits: state.config.designer.clone(),
            locks: state.locks.clone(),
        }
    }

    pub fn project(&self) -> ProjectService {
        ProjectService::new(self.daos.project(), self.limits.clone(), self.locks.clone())
    }
}
