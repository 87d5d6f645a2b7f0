use sea_orm::entity::prelude::*;

use crate::db::dao::base_traits::base_entity_impls;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(has_many)]
    pub tables: HasMany<super::schema_table::Entity>,
    #[sea_orm(has_many)]
    pub relationships: HasMany<super::table_relationship::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

base_entity_impls!();
