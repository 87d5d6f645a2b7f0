use sea_orm::DatabaseConnection;

use super::{DaoBase, ProjectDao};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn project(&self) -> ProjectDao {
        DaoBase::new(&self.db)
    }
}
