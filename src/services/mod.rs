pub mod context;
pub mod crud_service;
pub mod locks;
pub mod project_service;

pub use context::ServiceContext;
pub use locks::ProjectLocks;
pub use project_service::{ProjectChanges, ProjectDetail, ProjectService};
