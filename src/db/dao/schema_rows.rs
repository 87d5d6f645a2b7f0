use std::collections::HashMap;

use uuid::Uuid;

use crate::db::entities::{schema_table, table_column, table_relationship};
use crate::schema::{Column, Relationship, SchemaSnapshot, Table};

/// The stored rows of one project's schema.
///
/// `position` columns carry table creation order, column order within a table
/// and relationship creation order, so a load rebuilds the same snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaRows {
    pub tables: Vec<schema_table::Model>,
    pub columns: Vec<table_column::Model>,
    pub relationships: Vec<table_relationship::Model>,
}

impl SchemaRows {
    pub fn from_snapshot(project_id: Uuid, snapshot: &SchemaSnapshot) -> Self {
        let mut rows = Self::default();

        for (table_position, table) in snapshot.tables.iter().enumerate() {
            let row_id = Uuid::new_v4();
            rows.tables.push(schema_table::Model {
                id: row_id,
                project_id,
                table_id: table.id.to_string(),
                name: table.name.clone(),
                x: table.x,
                y: table.y,
                scale: table.scale,
                position: position(table_position),
            });
            for (column_position, column) in table.columns.iter().enumerate() {
                rows.columns.push(column_row(project_id, row_id, column_position, column));
            }
        }

        for (rel_position, rel) in snapshot.relationships.iter().enumerate() {
            rows.relationships.push(table_relationship::Model {
                id: Uuid::new_v4(),
                project_id,
                relationship_id: rel.id.to_string(),
                source_table: rel.source_table.to_string(),
                source_column: rel.source_column.to_string(),
                target_table: rel.target_table.to_string(),
                target_column: rel.target_column.to_string(),
                position: position(rel_position),
            });
        }

        rows
    }

    pub fn into_snapshot(self) -> SchemaSnapshot {
        let mut tables = self.tables;
        tables.sort_by_key(|row| row.position);

        let mut columns_by_table: HashMap<Uuid, Vec<table_column::Model>> = HashMap::new();
        for column in self.columns {
            columns_by_table
                .entry(column.schema_table_id)
                .or_default()
                .push(column);
        }

        let tables = tables
            .into_iter()
            .map(|row| {
                let mut columns = columns_by_table.remove(&row.id).unwrap_or_default();
                columns.sort_by_key(|column| column.position);
                Table {
                    id: row.table_id.into(),
                    name: row.name,
                    columns: columns.into_iter().map(column_from_row).collect(),
                    x: row.x,
                    y: row.y,
                    scale: row.scale,
                }
            })
            .collect();

        let mut relationships = self.relationships;
        relationships.sort_by_key(|row| row.position);
        let relationships = relationships
            .into_iter()
            .map(|row| Relationship {
                id: row.relationship_id.into(),
                source_table: row.source_table.into(),
                source_column: row.source_column.into(),
                target_table: row.target_table.into(),
                target_column: row.target_column.into(),
            })
            .collect();

        SchemaSnapshot {
            tables,
            relationships,
        }
    }
}

fn column_row(
    project_id: Uuid,
    schema_table_id: Uuid,
    index: usize,
    column: &Column,
) -> table_column::Model {
    table_column::Model {
        id: Uuid::new_v4(),
        project_id,
        schema_table_id,
        column_id: column.id.to_string(),
        name: column.name.clone(),
        data_type: column.data_type.clone(),
        is_primary_key: column.is_primary_key,
        is_foreign_key: column.is_foreign_key,
        reference_table: column.reference_table.as_ref().map(ToString::to_string),
        reference_column: column.reference_column.as_ref().map(ToString::to_string),
        not_null: column.not_null,
        default_value: column.default_value.clone(),
        position: position(index),
    }
}

fn column_from_row(row: table_column::Model) -> Column {
    Column {
        id: row.column_id.into(),
        name: row.name,
        data_type: row.data_type,
        is_primary_key: row.is_primary_key,
        is_foreign_key: row.is_foreign_key,
        reference_table: row.reference_table.map(Into::into),
        reference_column: row.reference_column.map(Into::into),
        not_null: row.not_null,
        default_value: row.default_value,
    }
}

fn position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
