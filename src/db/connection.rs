use std::time::Duration;

use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

use crate::config::DatabaseConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(cfg.url.clone());
    options
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_idle)
        .connect_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .context("failed to connect to the database")?;

    info!("syncing database schema from entities");
    db.get_schema_registry("schema_designer::db::entities::*")
        .sync(&db)
        .await
        .context("failed to sync database schema")?;
    Ok(db)
}
