#[allow(unused_imports)]
pub mod prelude {
    pub use super::project::Entity as Project;
    pub use super::schema_table::Entity as SchemaTable;
    pub use super::table_column::Entity as TableColumn;
    pub use super::table_relationship::Entity as TableRelationship;
}

pub mod project;
pub mod schema_table;
pub mod table_column;
pub mod table_relationship;
