use tracing::error;

use crate::db::dao::DaoLayerError;
use crate::schema::SchemaError;

pub(crate) const DATABASE_ERROR_MESSAGE: &str = "Database error";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Opaque 500 for a failure whose details must stay in the logs.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::fmt::Display,
    ) -> Self {
        let message = message.into();
        error!(error = %source, "{message}");
        Self::Internal(message)
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::Internal(message) => message.as_str(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<DaoLayerError> for AppError {
    fn from(err: DaoLayerError) -> Self {
        match err {
            DaoLayerError::NotFound { .. } => AppError::not_found(err.to_string()),
            DaoLayerError::InvalidPagination { .. } => AppError::bad_request(err.to_string()),
            DaoLayerError::Db(db_err) => {
                AppError::internal_with_source(DATABASE_ERROR_MESSAGE, db_err)
            }
        }
    }
}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::NotFound { .. } => AppError::not_found(err.to_string()),
            SchemaError::Validation(_) => AppError::bad_request(err.to_string()),
            SchemaError::Conflict(message) => AppError::conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;
    use uuid::Uuid;

    use super::*;
    use crate::schema::TableId;

    #[test]
    fn database_errors_stay_opaque() {
        let err = AppError::from(DaoLayerError::Db(DbErr::Custom("secret dsn".to_string())));

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(err.message(), "Database error");
    }

    #[test]
    fn dao_not_found_maps_to_not_found() {
        let err = AppError::from(DaoLayerError::NotFound {
            entity: "projects",
            id: Uuid::nil(),
        });

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn schema_errors_map_by_kind() {
        let validation = AppError::from(SchemaError::Validation(vec![
            "a".to_string(),
            "b".to_string(),
        ]));
        let missing = AppError::from(SchemaError::table_not_found(&TableId::from("table_1")));
        let conflict = AppError::from(SchemaError::Conflict("taken".to_string()));

        assert_eq!(validation.message(), "invalid schema change: a; b");
        assert!(matches!(missing, AppError::NotFound(_)));
        assert!(matches!(conflict, AppError::Conflict(ref m) if m == "taken"));
    }
}
