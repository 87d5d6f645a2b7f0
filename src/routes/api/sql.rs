use axum::{Json, Router, routing::post};

use crate::{
    error::AppError,
    response::SqlText,
    schema::{SchemaSnapshot, SqlOptions},
    services::ProjectService,
};

pub fn router() -> Router {
    Router::new().route("/sql", post(render_sql))
}

/// DDL for a posted schema; nothing is stored.
async fn render_sql(Json(snapshot): Json<SchemaSnapshot>) -> Result<SqlText, AppError> {
    let sql = ProjectService::render_sql(snapshot, &SqlOptions::generated_now())?;
    Ok(SqlText(sql))
}
