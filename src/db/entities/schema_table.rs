use sea_orm::entity::prelude::*;

/// One designer table of a project. `table_id` is the designer identifier
/// (`table_3`), `position` its creation order.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "schema_tables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub project_id: Uuid,
    pub table_id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub position: i32,
    #[sea_orm(belongs_to, from = "project_id", to = "id", on_delete = "Cascade")]
    pub project: HasOne<super::project::Entity>,
    #[sea_orm(has_many)]
    pub columns: HasMany<super::table_column::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
