use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "table_columns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(indexed)]
    pub project_id: Uuid,
    #[sea_orm(indexed)]
    pub schema_table_id: Uuid,
    pub column_id: String,
    pub name: String,
    pub data_type: String,
    #[sea_orm(default_value = false)]
    pub is_primary_key: bool,
    #[sea_orm(default_value = false)]
    pub is_foreign_key: bool,
    pub reference_table: Option<String>,
    pub reference_column: Option<String>,
    #[sea_orm(default_value = false)]
    pub not_null: bool,
    pub default_value: Option<String>,
    pub position: i32,
    #[sea_orm(belongs_to, from = "schema_table_id", to = "id", on_delete = "Cascade")]
    pub table: HasOne<super::schema_table::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
