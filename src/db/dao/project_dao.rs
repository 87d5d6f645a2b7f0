use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult, SchemaRows};
use super::base_traits::TimestampedActiveModel;
use crate::db::entities::prelude::{Project, SchemaTable, TableColumn, TableRelationship};
use crate::db::entities::{project, schema_table, table_column, table_relationship};

#[derive(Clone)]
pub struct ProjectDao {
    db: DatabaseConnection,
}

impl DaoBase for ProjectDao {
    type Entity = Project;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl ProjectDao {
    /// Deletes the project together with every stored schema row.
    pub async fn delete_project(&self, id: &Uuid) -> DaoResult<Uuid> {
        let txn = self.db.begin().await?;
        delete_schema_rows(&txn, id).await?;
        let result = Project::delete_by_id(*id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(DaoLayerError::NotFound {
                entity: Self::entity_name(),
                id: *id,
            });
        }
        txn.commit().await?;
        Ok(*id)
    }

    pub async fn load_schema(&self, id: &Uuid) -> DaoResult<SchemaRows> {
        let tables = SchemaTable::find()
            .filter(schema_table::Column::ProjectId.eq(*id))
            .order_by_asc(schema_table::Column::Position)
            .all(&self.db)
            .await?;
        let columns = TableColumn::find()
            .filter(table_column::Column::ProjectId.eq(*id))
            .order_by_asc(table_column::Column::Position)
            .all(&self.db)
            .await?;
        let relationships = TableRelationship::find()
            .filter(table_relationship::Column::ProjectId.eq(*id))
            .order_by_asc(table_relationship::Column::Position)
            .all(&self.db)
            .await?;

        Ok(SchemaRows {
            tables,
            columns,
            relationships,
        })
    }

    /// Replaces the stored schema of a project in one transaction. Dropping the
    /// transaction on any error rolls every statement back.
    pub async fn replace_schema(&self, id: &Uuid, rows: SchemaRows) -> DaoResult<project::Model> {
        let txn = self.db.begin().await?;

        let existing = Project::find_by_id(*id)
            .one(&txn)
            .await?
            .ok_or(DaoLayerError::NotFound {
                entity: Self::entity_name(),
                id: *id,
            })?;
        let mut active = existing.into_active_model();
        active.set_updated_at(Utc::now().fixed_offset());
        let project = active.update(&txn).await?;

        delete_schema_rows(&txn, id).await?;

        debug!(
            project_id = %id,
            tables = rows.tables.len(),
            columns = rows.columns.len(),
            relationships = rows.relationships.len(),
            "writing schema rows"
        );
        if !rows.tables.is_empty() {
            SchemaTable::insert_many(
                rows.tables
                    .into_iter()
                    .map(|row| row.into_active_model().reset_all()),
            )
            .exec_without_returning(&txn)
            .await?;
        }
        if !rows.columns.is_empty() {
            TableColumn::insert_many(
                rows.columns
                    .into_iter()
                    .map(|row| row.into_active_model().reset_all()),
            )
            .exec_without_returning(&txn)
            .await?;
        }
        if !rows.relationships.is_empty() {
            TableRelationship::insert_many(
                rows.relationships
                    .into_iter()
                    .map(|row| row.into_active_model().reset_all()),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(project)
    }
}

async fn delete_schema_rows<C>(conn: &C, project_id: &Uuid) -> DaoResult<()>
where
    C: ConnectionTrait,
{
    TableRelationship::delete_many()
        .filter(table_relationship::Column::ProjectId.eq(*project_id))
        .exec(conn)
        .await?;
    TableColumn::delete_many()
        .filter(table_column::Column::ProjectId.eq(*project_id))
        .exec(conn)
        .await?;
    SchemaTable::delete_many()
        .filter(schema_table::Column::ProjectId.eq(*project_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::ProjectDao;
    use crate::db::dao::{DaoBase, DaoLayerError};
    use crate::db::entities::{project, schema_table, table_column, table_relationship};

    fn ts() -> chrono::DateTime<chrono::FixedOffset> {
        FixedOffset::east_opt(0)
            .expect("offset should be valid")
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn project_model(id: Uuid, name: &str) -> project::Model {
        let now = ts();
        project::Model {
            id,
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn find_project_reports_missing_rows() {
        let id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<project::Model>::new()])
            .into_connection();
        let dao = ProjectDao::new(&db);

        let err = dao.find_by_id(id).await.expect_err("project should be missing");

        assert!(matches!(err, DaoLayerError::NotFound { id: missing, .. } if missing == id));
    }

    #[tokio::test]
    async fn paged_find_detects_next_page() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                project_model(Uuid::new_v4(), "a"),
                project_model(Uuid::new_v4(), "b"),
                project_model(Uuid::new_v4(), "c"),
            ]])
            .into_connection();
        let dao = ProjectDao::new(&db);

        let page = dao
            .find(1, 2, None, |query| query)
            .await
            .expect("list should succeed");

        assert_eq!(page.data.len(), 2);
        assert!(page.has_next);
    }

    #[tokio::test]
    async fn paged_find_rejects_oversized_pages() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let dao = ProjectDao::new(&db);

        let err = dao
            .find(1, 500, None, |query| query)
            .await
            .expect_err("page too large");

        assert!(matches!(err, DaoLayerError::InvalidPagination { .. }));
    }

    #[tokio::test]
    async fn load_schema_collects_rows_of_all_three_tables() {
        let project_id = Uuid::new_v4();
        let table_row = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![schema_table::Model {
                id: table_row,
                project_id,
                table_id: "table_1".to_string(),
                name: "users".to_string(),
                x: 0.0,
                y: 0.0,
                scale: 1.0,
                position: 0,
            }]])
            .append_query_results([vec![table_column::Model {
                id: Uuid::new_v4(),
                project_id,
                schema_table_id: table_row,
                column_id: "column_1".to_string(),
                name: "id".to_string(),
                data_type: "SERIAL".to_string(),
                is_primary_key: true,
                is_foreign_key: false,
                reference_table: None,
                reference_column: None,
                not_null: false,
                default_value: None,
                position: 0,
            }]])
            .append_query_results([Vec::<table_relationship::Model>::new()])
            .into_connection();
        let dao = ProjectDao::new(&db);

        let snapshot = dao
            .load_schema(&project_id)
            .await
            .expect("load should succeed")
            .into_snapshot();

        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].columns[0].name, "id");
        assert!(snapshot.relationships.is_empty());
    }

    #[tokio::test]
    async fn delete_project_reports_missing_project() {
        let id = Uuid::new_v4();
        let deleted = |rows_affected| MockExecResult {
            last_insert_id: 0,
            rows_affected,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([deleted(0), deleted(0), deleted(0), deleted(0)])
            .into_connection();
        let dao = ProjectDao::new(&db);

        let err = dao.delete_project(&id).await.expect_err("nothing to delete");

        assert!(matches!(err, DaoLayerError::NotFound { entity: "projects", .. }));
    }

    #[tokio::test]
    async fn replace_schema_requires_the_project() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<project::Model>::new()])
            .into_connection();
        let dao = ProjectDao::new(&db);

        let err = dao
            .replace_schema(&Uuid::new_v4(), Default::default())
            .await
            .expect_err("project should be missing");

        assert!(matches!(err, DaoLayerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn database_errors_are_wrapped() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("boom".to_string())])
            .into_connection();
        let dao = ProjectDao::new(&db);

        let err = dao
            .find_by_id(Uuid::new_v4())
            .await
            .expect_err("query should fail");

        assert!(matches!(err, DaoLayerError::Db(_)));
        assert!(err.to_string().starts_with("Database error"));
    }
}
