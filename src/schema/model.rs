use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::{SchemaError, SchemaResult};
use super::ids::{ColumnId, RelationshipId, TableId};

pub const DEFAULT_TABLE_SCALE: f64 = 1.0;

fn default_scale() -> f64 {
    DEFAULT_TABLE_SCALE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub reference_table: Option<TableId>,
    #[serde(default)]
    pub reference_column: Option<ColumnId>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl Column {
    /// Builds a column from a spec. References are only kept for foreign keys.
    pub fn from_spec(id: ColumnId, spec: ColumnSpec) -> Self {
        let (reference_table, reference_column) = if spec.is_foreign_key {
            (spec.reference_table, spec.reference_column)
        } else {
            (None, None)
        };
        Self {
            id,
            name: spec.name.trim().to_string(),
            data_type: spec.data_type.trim().to_string(),
            is_primary_key: spec.is_primary_key,
            is_foreign_key: spec.is_foreign_key,
            reference_table,
            reference_column,
            not_null: spec.not_null,
            default_value: spec.default_value,
        }
    }

    /// The `(table, column)` this column points at, when it is a fully bound foreign key.
    pub fn reference(&self) -> Option<(&TableId, &ColumnId)> {
        if !self.is_foreign_key {
            return None;
        }
        match (&self.reference_table, &self.reference_column) {
            (Some(table), Some(column)) => Some((table, column)),
            _ => None,
        }
    }
}

/// Column command object: what the caller wants a column to look like.
///
/// `id` is only meaningful when editing a table through
/// [`Schema::save_table`](super::Schema::save_table), where it selects the existing
/// column to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    #[serde(default)]
    pub id: Option<ColumnId>,
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub reference_table: Option<TableId>,
    #[serde(default)]
    pub reference_column: Option<ColumnId>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ..Self::default()
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn references(mut self, table: &TableId, column: &ColumnId) -> Self {
        self.is_foreign_key = true;
        self.reference_table = Some(table.clone());
        self.reference_column = Some(column.clone());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_id(mut self, id: &ColumnId) -> Self {
        self.id = Some(id.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: TableId,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

impl Table {
    pub fn new(id: TableId, name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            name: name.into(),
            columns: Vec::new(),
            x,
            y,
            scale: DEFAULT_TABLE_SCALE,
        }
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| &column.id == id)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub(crate) fn column_position(&self, id: &ColumnId) -> Option<usize> {
        self.columns.iter().position(|column| &column.id == id)
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    pub fn remove_column(&mut self, id: &ColumnId) -> Option<Column> {
        let index = self.column_position(id)?;
        Some(self.columns.remove(index))
    }

    pub fn move_column(&mut self, id: &ColumnId, new_index: usize) -> SchemaResult<()> {
        let current = self
            .column_position(id)
            .ok_or_else(|| SchemaError::column_not_found(id))?;
        if new_index >= self.columns.len() {
            return Err(SchemaError::invalid(format!(
                "column index {new_index} is out of range for table '{}' ({} columns)",
                self.name,
                self.columns.len()
            )));
        }
        let column = self.columns.remove(current);
        self.columns.insert(new_index, column);
        Ok(())
    }

    /// Replaces the column order wholesale. `ordered` must be a permutation of the
    /// current column ids; anything else leaves the table untouched.
    pub fn update_columns_order(&mut self, ordered: &[ColumnId]) -> SchemaResult<()> {
        if ordered.len() != self.columns.len() {
            return Err(SchemaError::invalid(format!(
                "expected {} column ids for table '{}', got {}",
                self.columns.len(),
                self.name,
                ordered.len()
            )));
        }

        let mut seen = HashSet::with_capacity(ordered.len());
        let mut positions = Vec::with_capacity(ordered.len());
        for id in ordered {
            if !seen.insert(id) {
                return Err(SchemaError::invalid(format!("column id {id} is listed twice")));
            }
            let position = self
                .column_position(id)
                .ok_or_else(|| SchemaError::column_not_found(id))?;
            positions.push(position);
        }

        let reordered = positions
            .into_iter()
            .map(|position| self.columns[position].clone())
            .collect();
        self.columns = reordered;
        Ok(())
    }

    pub fn primary_keys(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|column| column.is_primary_key)
            .collect()
    }

    pub fn foreign_keys(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|column| column.is_foreign_key)
            .collect()
    }
}

/// Directed edge: `source_column` (foreign key) references `target_column` (primary key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_table: TableId,
    pub source_column: ColumnId,
    pub target_table: TableId,
    pub target_column: ColumnId,
}

impl Relationship {
    pub fn involves_table(&self, table: &TableId) -> bool {
        &self.source_table == table || &self.target_table == table
    }

    pub fn involves_column(&self, table: &TableId, column: &ColumnId) -> bool {
        (&self.source_table == table && &self.source_column == column)
            || (&self.target_table == table && &self.target_column == column)
    }

    pub fn has_source(&self, table: &TableId, column: &ColumnId) -> bool {
        &self.source_table == table && &self.source_column == column
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(names: &[&str]) -> Table {
        let mut table = Table::new(TableId::from("table_1"), "accounts", 0.0, 0.0);
        for (index, name) in names.iter().enumerate() {
            let id = ColumnId::new(format!("column_{}", index + 1));
            table.add_column(Column::from_spec(id, ColumnSpec::new(*name, "TEXT")));
        }
        table
    }

    fn names(table: &Table) -> Vec<&str> {
        table.columns.iter().map(|column| column.name.as_str()).collect()
    }

    #[test]
    fn move_column_relocates_within_bounds() {
        let mut table = table_with(&["a", "b", "c"]);

        table
            .move_column(&ColumnId::from("column_3"), 0)
            .expect("move should succeed");

        assert_eq!(names(&table), ["c", "a", "b"]);
    }

    #[test]
    fn move_column_rejects_unknown_id_and_bad_index() {
        let mut table = table_with(&["a", "b"]);

        let unknown = table.move_column(&ColumnId::from("column_9"), 0);
        let out_of_range = table.move_column(&ColumnId::from("column_1"), 2);

        assert!(matches!(unknown, Err(SchemaError::NotFound { .. })));
        assert!(matches!(out_of_range, Err(SchemaError::Validation(_))));
        assert_eq!(names(&table), ["a", "b"]);
    }

    #[test]
    fn update_columns_order_applies_permutation() {
        let mut table = table_with(&["a", "b", "c"]);
        let order = [
            ColumnId::from("column_2"),
            ColumnId::from("column_3"),
            ColumnId::from("column_1"),
        ];

        table.update_columns_order(&order).expect("reorder should succeed");

        assert_eq!(names(&table), ["b", "c", "a"]);
    }

    #[test]
    fn update_columns_order_is_all_or_nothing() {
        let mut table = table_with(&["a", "b", "c"]);
        let short = [ColumnId::from("column_1"), ColumnId::from("column_2")];
        let duplicated = [
            ColumnId::from("column_1"),
            ColumnId::from("column_1"),
            ColumnId::from("column_2"),
        ];
        let foreign = [
            ColumnId::from("column_1"),
            ColumnId::from("column_2"),
            ColumnId::from("column_7"),
        ];

        assert!(table.update_columns_order(&short).is_err());
        assert!(table.update_columns_order(&duplicated).is_err());
        assert!(table.update_columns_order(&foreign).is_err());
        assert_eq!(names(&table), ["a", "b", "c"]);
    }

    #[test]
    fn remove_column_is_noop_for_unknown_id() {
        let mut table = table_with(&["a"]);

        assert!(table.remove_column(&ColumnId::from("column_5")).is_none());
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn key_filters_keep_column_order() {
        let mut table = Table::new(TableId::from("table_1"), "orders", 0.0, 0.0);
        let target_table = TableId::from("table_9");
        let target_column = ColumnId::from("column_90");
        table.add_column(Column::from_spec(
            ColumnId::from("column_1"),
            ColumnSpec::new("user_id", "INTEGER").references(&target_table, &target_column),
        ));
        table.add_column(Column::from_spec(
            ColumnId::from("column_2"),
            ColumnSpec::new("id", "SERIAL").primary_key(),
        ));
        table.add_column(Column::from_spec(
            ColumnId::from("column_3"),
            ColumnSpec::new("code", "TEXT").primary_key(),
        ));

        let pks: Vec<&str> = table.primary_keys().iter().map(|c| c.name.as_str()).collect();
        let fks: Vec<&str> = table.foreign_keys().iter().map(|c| c.name.as_str()).collect();

        assert_eq!(pks, ["id", "code"]);
        assert_eq!(fks, ["user_id"]);
    }

    #[test]
    fn from_spec_drops_references_on_plain_columns() {
        let spec = ColumnSpec {
            reference_table: Some(TableId::from("table_2")),
            reference_column: Some(ColumnId::from("column_2")),
            ..ColumnSpec::new("note", "TEXT")
        };

        let column = Column::from_spec(ColumnId::from("column_1"), spec);

        assert!(column.reference_table.is_none());
        assert!(column.reference().is_none());
    }
}
