use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::dao::PaginatedResponse,
    db::entities::project,
    error::AppError,
    response::{ApiResult, JsonApiResponse, SqlText},
    schema::{SchemaSnapshot, SqlOptions, TableDraft, TableId},
    services::{ProjectChanges, ProjectDetail, ServiceContext, project_service::ProjectService},
    state::AppState,
};

const DEFAULT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A blank `description` clears it.
#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    pub project: ProjectResponse,
    pub schema: SchemaSnapshot,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/{id}/schema", put(save_schema))
        .route("/projects/{id}/sql", get(export_sql))
        .route("/projects/{id}/tables", put(save_table))
        .route("/projects/{id}/tables/{table_id}", delete(remove_table))
        .with_state(state)
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<PaginatedResponse<ProjectResponse>> {
    let page = project_service_from_state(state.as_ref())
        .list_projects(query.page, query.page_size)
        .await?;
    JsonApiResponse::ok(page.map(ProjectResponse::from))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<ProjectResponse> {
    let project = project_service_from_state(state.as_ref())
        .create_project(&body.name, body.description)
        .await?;
    JsonApiResponse::with_status(StatusCode::CREATED, "created", project.into())
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectDetailResponse> {
    let detail = project_service_from_state(state.as_ref())
        .get_project(&id)
        .await?;
    JsonApiResponse::ok(detail.into())
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectResponse> {
    let changes = ProjectChanges {
        name: body.name,
        description: body.description.map(Some),
    };
    let project = project_service_from_state(state.as_ref())
        .update_project(&id, changes)
        .await?;
    JsonApiResponse::ok(project.into())
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeletedResponse> {
    project_service_from_state(state.as_ref())
        .delete_project(&id)
        .await?;
    JsonApiResponse::with_status(StatusCode::OK, "deleted", DeletedResponse { id })
}

async fn save_schema(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(snapshot): Json<SchemaSnapshot>,
) -> ApiResult<ProjectDetailResponse> {
    let detail = project_service_from_state(state.as_ref())
        .save_schema(&id, snapshot)
        .await?;
    JsonApiResponse::ok(detail.into())
}

async fn save_table(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(draft): Json<TableDraft>,
) -> ApiResult<ProjectDetailResponse> {
    let detail = project_service_from_state(state.as_ref())
        .save_table(&id, draft)
        .await?;
    JsonApiResponse::ok(detail.into())
}

async fn remove_table(
    State(state): State<Arc<AppState>>,
    Path((id, table_id)): Path<(Uuid, String)>,
) -> ApiResult<ProjectDetailResponse> {
    let detail = project_service_from_state(state.as_ref())
        .remove_table(&id, &TableId::from(table_id))
        .await?;
    JsonApiResponse::ok(detail.into())
}

async fn export_sql(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<SqlText, AppError> {
    let sql = project_service_from_state(state.as_ref())
        .export_sql(&id, &SqlOptions::generated_now())
        .await?;
    Ok(SqlText(sql))
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl From<project::Model> for ProjectResponse {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ProjectDetail> for ProjectDetailResponse {
    fn from(detail: ProjectDetail) -> Self {
        Self {
            project: detail.project.into(),
            schema: detail.schema,
        }
    }
}

fn project_service_from_state(state: &AppState) -> ProjectService {
    ServiceContext::from_state(state).project()
}
