use thiserror::Error;

use super::ids::{ColumnId, IdKind, TableId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{kind} not found (id={id})")]
    NotFound { kind: &'static str, id: String },
    #[error("invalid schema change: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Conflict(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

impl SchemaError {
    pub fn table_not_found(id: &TableId) -> Self {
        Self::NotFound {
            kind: IdKind::Table.label(),
            id: id.to_string(),
        }
    }

    pub fn column_not_found(id: &ColumnId) -> Self {
        Self::NotFound {
            kind: IdKind::Column.label(),
            id: id.to_string(),
        }
    }

    pub fn invalid(issue: impl Into<String>) -> Self {
        Self::Validation(vec![issue.into()])
    }

    /// Validation issues carried by the error; empty for other variants.
    pub fn issues(&self) -> &[String] {
        match self {
            Self::Validation(issues) => issues,
            _ => &[],
        }
    }
}
