use sea_orm::{Order, Set};
use tracing::info;
use uuid::Uuid;

use crate::config::DesignerConfig;
use crate::db::dao::{PaginatedResponse, ProjectDao, SchemaRows};
use crate::db::entities::project;
use crate::error::AppError;
use crate::schema::{Schema, SchemaSnapshot, SqlOptions, TableDraft, TableId, generate_sql};
use crate::services::crud_service::{CrudErrors, CrudOp, CrudService};
use crate::services::locks::ProjectLocks;

const CORRUPT_SCHEMA_MESSAGE: &str = "Stored schema could not be loaded";

/// Partial update of a project. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// A project together with its stored schema.
#[derive(Debug, Clone)]
pub struct ProjectDetail {
    pub project: project::Model,
    pub schema: SchemaSnapshot,
}

#[derive(Clone)]
pub struct ProjectService {
    project_dao: ProjectDao,
    limits: DesignerConfig,
    locks: ProjectLocks,
}

impl ProjectService {
    pub fn new(project_dao: ProjectDao, limits: DesignerConfig, locks: ProjectLocks) -> Self {
        Self {
            project_dao,
            limits,
            locks,
        }
    }

    pub async fn create_project(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<project::Model, AppError> {
        let name = required_name(name)?;
        let model = project::ActiveModel {
            name: Set(name),
            description: Set(normalize_description(description)),
            ..Default::default()
        };

        let project = CrudService::create(self, model).await?;
        info!(project_id = %project.id, "project created");
        Ok(project)
    }

    pub async fn list_projects(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<PaginatedResponse<project::Model>, AppError> {
        CrudService::find(
            self,
            page,
            page_size,
            Some((project::Column::UpdatedAt, Order::Desc)),
            |query| query,
        )
        .await
    }

    pub async fn require_project(&self, id: &Uuid) -> Result<project::Model, AppError> {
        CrudService::find_by_id(self, *id).await
    }

    pub async fn get_project(&self, id: &Uuid) -> Result<ProjectDetail, AppError> {
        let project = self.require_project(id).await?;
        let schema = self.load_schema(id).await?.snapshot();
        Ok(ProjectDetail { project, schema })
    }

    pub async fn update_project(
        &self,
        id: &Uuid,
        changes: ProjectChanges,
    ) -> Result<project::Model, AppError> {
        if changes.is_empty() {
            return Err(AppError::bad_request("Nothing to update"));
        }
        let name = changes.name.as_deref().map(required_name).transpose()?;
        let description = changes.description.map(normalize_description);

        CrudService::update(self, *id, move |active| {
            if let Some(name) = name {
                active.name = Set(name);
            }
            if let Some(description) = description {
                active.description = Set(description);
            }
        })
        .await
    }

    pub async fn delete_project(&self, id: &Uuid) -> Result<(), AppError> {
        let _guard = self.locks.acquire(*id).await;
        self.project_dao
            .delete_project(id)
            .await
            .map_err(|err| self.map_error(CrudOp::Delete, err))?;
        info!(project_id = %id, "project deleted");
        Ok(())
    }

    /// Replaces the stored schema with `snapshot` after checking it hydrates
    /// cleanly and stays within the configured limits.
    pub async fn save_schema(
        &self,
        id: &Uuid,
        snapshot: SchemaSnapshot,
    ) -> Result<ProjectDetail, AppError> {
        let schema = Schema::from_snapshot(snapshot)?;
        let _guard = self.locks.acquire(*id).await;
        self.store(id, &schema).await
    }

    /// Applies a table editor draft to the stored schema.
    pub async fn save_table(&self, id: &Uuid, draft: TableDraft) -> Result<ProjectDetail, AppError> {
        let _guard = self.locks.acquire(*id).await;
        self.require_project(id).await?;
        let mut schema = self.load_schema(id).await?;
        schema.save_table(draft)?;
        self.store(id, &schema).await
    }

    /// Removes a table and every relationship touching it from the stored schema.
    pub async fn remove_table(
        &self,
        id: &Uuid,
        table_id: &TableId,
    ) -> Result<ProjectDetail, AppError> {
        let _guard = self.locks.acquire(*id).await;
        self.require_project(id).await?;
        let mut schema = self.load_schema(id).await?;
        if schema.remove_table(table_id).is_none() {
            return Err(AppError::not_found(format!("table {table_id} does not exist")));
        }
        self.store(id, &schema).await
    }

    pub async fn export_sql(&self, id: &Uuid, options: &SqlOptions) -> Result<String, AppError> {
        self.require_project(id).await?;
        let schema = self.load_schema(id).await?;
        Ok(generate_sql(&schema, options))
    }

    /// DDL for a schema that is not stored anywhere.
    pub fn render_sql(snapshot: SchemaSnapshot, options: &SqlOptions) -> Result<String, AppError> {
        let schema = Schema::from_snapshot(snapshot)?;
        Ok(generate_sql(&schema, options))
    }

    async fn load_schema(&self, id: &Uuid) -> Result<Schema, AppError> {
        let rows = self
            .project_dao
            .load_schema(id)
            .await
            .map_err(|err| self.map_error(CrudOp::Find, err))?;
        Schema::from_snapshot(rows.into_snapshot())
            .map_err(|err| AppError::internal_with_source(CORRUPT_SCHEMA_MESSAGE, err))
    }

    async fn store(&self, id: &Uuid, schema: &Schema) -> Result<ProjectDetail, AppError> {
        let snapshot = schema.snapshot();
        self.check_limits(&snapshot)?;

        let rows = SchemaRows::from_snapshot(*id, &snapshot);
        let project = self
            .project_dao
            .replace_schema(id, rows)
            .await
            .map_err(|err| self.map_error(CrudOp::Update, err))?;
        info!(
            project_id = %id,
            tables = snapshot.tables.len(),
            columns = snapshot.column_count(),
            relationships = snapshot.relationships.len(),
            "schema saved"
        );

        Ok(ProjectDetail {
            project,
            schema: snapshot,
        })
    }

    fn check_limits(&self, snapshot: &SchemaSnapshot) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if snapshot.tables.len() > self.limits.max_tables {
            issues.push(format!(
                "schema has {} tables, the limit is {}",
                snapshot.tables.len(),
                self.limits.max_tables
            ));
        }
        for table in &snapshot.tables {
            if table.columns.len() > self.limits.max_columns_per_table {
                issues.push(format!(
                    "table '{}' has {} columns, the limit is {}",
                    table.name,
                    table.columns.len(),
                    self.limits.max_columns_per_table
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::bad_request(issues.join("; ")))
        }
    }
}

impl CrudService for ProjectService {
    type Dao = ProjectDao;

    fn dao(&self) -> &Self::Dao {
        &self.project_dao
    }

    fn errors(&self) -> CrudErrors {
        CrudErrors {
            create_failed: "Project create failed",
            find_failed: "Project lookup failed",
            not_found: "Project not found",
            update_failed: "Project update failed",
            delete_failed: "Project delete failed",
        }
    }
}

fn required_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Project name must not be blank"));
    }
    Ok(name.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
