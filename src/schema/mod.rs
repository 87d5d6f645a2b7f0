//! In-memory schema designer core: the table/column/relationship model, its
//! cascades and validation, and the SQL DDL export.

pub mod aggregate;
pub mod draft;
pub mod error;
pub mod ids;
pub mod model;
pub mod snapshot;
pub mod sql;

pub use aggregate::Schema;
pub use draft::TableDraft;
pub use error::{SchemaError, SchemaResult};
pub use ids::{ColumnId, IdGenerator, IdKind, RelationshipId, TableId};
pub use model::{Column, ColumnSpec, Relationship, Table};
pub use snapshot::SchemaSnapshot;
pub use sql::{escape_name, generate_sql, is_reserved_word, SqlOptions};
