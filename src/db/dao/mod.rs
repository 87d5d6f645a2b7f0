pub mod base;
pub mod base_traits;
mod context;
pub mod error;
pub mod project_dao;
pub mod schema_rows;

pub use base::{DaoBase, PaginatedResponse};
pub use base_traits::{HasCreatedAtColumn, HasIdActiveModel, TimestampedActiveModel};
pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use project_dao::ProjectDao;
pub use schema_rows::SchemaRows;
