use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::aggregate::Schema;
use super::error::{SchemaError, SchemaResult};
use super::ids::{ColumnId, IdGenerator, IdKind, TableId};
use super::model::{Column, Relationship, Table};

/// Flat, serializable form of a [`Schema`]. This is the JSON body the HTTP API
/// accepts and returns, and the shape rows are loaded into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl SchemaSnapshot {
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|table| table.columns.len()).sum()
    }
}

impl Schema {
    pub fn snapshot(&self) -> SchemaSnapshot {
        SchemaSnapshot {
            tables: self.tables.clone(),
            relationships: self.relationships.clone(),
        }
    }

    /// Rebuilds a schema from a snapshot, keeping every stored id.
    ///
    /// Relationships are replayed as stored rather than derived from the columns.
    /// Duplicated ids, foreign keys without a reference, references to
    /// non-primary-key columns and a second relationship on the same source
    /// column are rejected. Relationships whose endpoints do not resolve are kept
    /// and logged, since the SQL generator skips them anyway.
    pub fn from_snapshot(snapshot: SchemaSnapshot) -> SchemaResult<Self> {
        let mut issues = Vec::new();
        let mut ids = IdGenerator::new();
        let mut table_ids = HashSet::new();
        let mut column_ids = HashSet::new();

        for table in &snapshot.tables {
            if !table_ids.insert(&table.id) {
                issues.push(format!("table id {} is used more than once", table.id));
            }
            if !(table.x.is_finite() && table.y.is_finite()) {
                issues.push(format!("table '{}' has a non-finite position", table.name));
            }
            if !table.scale.is_finite() || table.scale <= 0.0 {
                issues.push(format!(
                    "table '{}' has an invalid scale {}",
                    table.name, table.scale
                ));
            }
            ids.observe(IdKind::Table, table.id.as_str());
            for column in &table.columns {
                if !column_ids.insert(&column.id) {
                    issues.push(format!("column id {} is used more than once", column.id));
                }
                ids.observe(IdKind::Column, column.id.as_str());
            }
        }

        for table in &snapshot.tables {
            for column in table.columns.iter().filter(|column| column.is_foreign_key) {
                let Some((target_table, target_column)) = column.reference() else {
                    issues.push(format!(
                        "foreign key '{}.{}' must name a referenced table and column",
                        table.name, column.name
                    ));
                    continue;
                };
                if let Some(target) = find_column(&snapshot.tables, target_table, target_column) {
                    if !target.is_primary_key {
                        issues.push(format!(
                            "foreign key '{}.{}' must reference a primary key, but '{}' is not one",
                            table.name, column.name, target.name
                        ));
                    }
                }
            }
        }

        let mut relationship_ids = HashSet::new();
        let mut sources = HashSet::new();
        for rel in &snapshot.relationships {
            if !relationship_ids.insert(&rel.id) {
                issues.push(format!("relationship id {} is used more than once", rel.id));
            }
            if !sources.insert((&rel.source_table, &rel.source_column)) {
                issues.push(format!(
                    "column {} of table {} has more than one relationship",
                    rel.source_column, rel.source_table
                ));
            }
            let target = find_column(&snapshot.tables, &rel.target_table, &rel.target_column);
            if let Some(target) = target {
                if !target.is_primary_key {
                    issues.push(format!(
                        "relationship {} must target a primary key, but '{}' is not one",
                        rel.id, target.name
                    ));
                }
            }
            ids.observe(IdKind::Relationship, rel.id.as_str());
        }

        if !issues.is_empty() {
            return Err(SchemaError::Validation(issues));
        }

        let schema = Self {
            tables: snapshot.tables,
            relationships: snapshot.relationships,
            ids,
        };
        for rel in &schema.relationships {
            let resolved = schema.column(&rel.source_table, &rel.source_column).is_some()
                && schema.column(&rel.target_table, &rel.target_column).is_some();
            if !resolved {
                warn!(
                    relationship = %rel.id,
                    source_table = %rel.source_table,
                    target_table = %rel.target_table,
                    "relationship endpoints do not resolve; keeping it as stored"
                );
            }
        }
        Ok(schema)
    }
}

fn find_column<'a>(
    tables: &'a [Table],
    table_id: &TableId,
    column_id: &ColumnId,
) -> Option<&'a Column> {
    tables
        .iter()
        .find(|table| &table.id == table_id)?
        .column(column_id)
}
