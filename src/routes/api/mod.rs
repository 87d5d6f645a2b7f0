pub mod health;
pub mod projects;
mod router;
pub mod sql;

pub use router::router;
