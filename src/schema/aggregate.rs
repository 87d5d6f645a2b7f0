use super::error::{SchemaError, SchemaResult};
use super::ids::{ColumnId, IdGenerator, RelationshipId, TableId};
use super::model::{Column, ColumnSpec, Relationship, Table};

/// Aggregate root of a designed database: owns every table and relationship and
/// keeps them consistent through cascades.
///
/// Tables and relationships are kept in creation order, which is also the order
/// the SQL generator emits them in.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub(super) tables: Vec<Table>,
    pub(super) relationships: Vec<Relationship>,
    pub(super) ids: IdGenerator,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.tables.iter().find(|table| &table.id == id)
    }

    pub(super) fn table_mut(&mut self, id: &TableId) -> SchemaResult<&mut Table> {
        self.tables
            .iter_mut()
            .find(|table| &table.id == id)
            .ok_or_else(|| SchemaError::table_not_found(id))
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn column(&self, table_id: &TableId, column_id: &ColumnId) -> Option<&Column> {
        self.table(table_id)?.column(column_id)
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|rel| &rel.id == id)
    }

    pub fn create_table(&mut self, name: impl Into<String>, x: f64, y: f64) -> &Table {
        let id = self.ids.next_table_id();
        let index = self.tables.len();
        self.tables.push(Table::new(id, name, x, y));
        &self.tables[index]
    }

    /// Removes the table, its columns and every relationship it takes part in.
    pub fn remove_table(&mut self, id: &TableId) -> Option<Table> {
        let index = self.tables.iter().position(|table| &table.id == id)?;
        self.relationships.retain(|rel| !rel.involves_table(id));
        Some(self.tables.remove(index))
    }

    pub fn rename_table(&mut self, id: &TableId, name: impl Into<String>) -> SchemaResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SchemaError::invalid("table name must not be blank"));
        }
        self.table_mut(id)?.name = name.trim().to_string();
        Ok(())
    }

    pub fn move_table(&mut self, id: &TableId, x: f64, y: f64) -> SchemaResult<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(SchemaError::invalid("table position must be finite"));
        }
        let table = self.table_mut(id)?;
        table.x = x;
        table.y = y;
        Ok(())
    }

    pub fn set_table_scale(&mut self, id: &TableId, scale: f64) -> SchemaResult<()> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SchemaError::invalid(format!(
                "table scale must be a positive number, got {scale}"
            )));
        }
        self.table_mut(id)?.scale = scale;
        Ok(())
    }

    /// Appends a column to `table_id`. Foreign-key columns get their relationship
    /// created in the same step.
    pub fn create_column(&mut self, table_id: &TableId, spec: ColumnSpec) -> SchemaResult<&Column> {
        if self.table(table_id).is_none() {
            return Err(SchemaError::table_not_found(table_id));
        }

        let mut issues = Vec::new();
        if spec.name.trim().is_empty() {
            issues.push("column name must not be blank".to_string());
        }
        if let Some(issue) = self.reference_issue(&spec) {
            issues.push(issue);
        }
        if !issues.is_empty() {
            return Err(SchemaError::Validation(issues));
        }

        let column = Column::from_spec(self.ids.next_column_id(), spec);
        let column_id = column.id.clone();
        let reference = column
            .reference()
            .map(|(table, col)| (table.clone(), col.clone()));

        self.table_mut(table_id)?.add_column(column);
        if let Some((target_table, target_column)) = reference {
            self.push_relationship(table_id.clone(), column_id.clone(), target_table, target_column);
        }

        self.column(table_id, &column_id)
            .ok_or_else(|| SchemaError::column_not_found(&column_id))
    }

    /// Removes the column and every relationship that has it on either end.
    /// Unknown tables or columns are a no-op.
    pub fn remove_column(&mut self, table_id: &TableId, column_id: &ColumnId) -> Option<Column> {
        let table = self.tables.iter_mut().find(|table| &table.id == table_id)?;
        let removed = table.remove_column(column_id)?;
        self.relationships
            .retain(|rel| !rel.involves_column(table_id, column_id));
        Some(removed)
    }

    pub fn move_column(
        &mut self,
        table_id: &TableId,
        column_id: &ColumnId,
        new_index: usize,
    ) -> SchemaResult<()> {
        self.table_mut(table_id)?.move_column(column_id, new_index)
    }

    pub fn update_columns_order(
        &mut self,
        table_id: &TableId,
        ordered: &[ColumnId],
    ) -> SchemaResult<()> {
        self.table_mut(table_id)?.update_columns_order(ordered)
    }

    pub fn create_relationship(
        &mut self,
        source_table: &TableId,
        source_column: &ColumnId,
        target_table: &TableId,
        target_column: &ColumnId,
    ) -> SchemaResult<&Relationship> {
        let source = self
            .table(source_table)
            .ok_or_else(|| SchemaError::table_not_found(source_table))?;
        if source.column(source_column).is_none() {
            return Err(SchemaError::column_not_found(source_column));
        }
        let target = self
            .table(target_table)
            .ok_or_else(|| SchemaError::table_not_found(target_table))?;
        if target.column(target_column).is_none() {
            return Err(SchemaError::column_not_found(target_column));
        }
        if let Some(existing) = self
            .relationships
            .iter()
            .find(|rel| rel.has_source(source_table, source_column))
        {
            return Err(SchemaError::Conflict(format!(
                "column {source_column} of table {source_table} already has relationship {}",
                existing.id
            )));
        }

        let index = self.push_relationship(
            source_table.clone(),
            source_column.clone(),
            target_table.clone(),
            target_column.clone(),
        );
        Ok(&self.relationships[index])
    }

    pub fn remove_relationship(&mut self, id: &RelationshipId) -> Option<Relationship> {
        let index = self.relationships.iter().position(|rel| &rel.id == id)?;
        Some(self.relationships.remove(index))
    }

    pub(super) fn push_relationship(
        &mut self,
        source_table: TableId,
        source_column: ColumnId,
        target_table: TableId,
        target_column: ColumnId,
    ) -> usize {
        let id = self.ids.next_relationship_id();
        self.relationships.push(Relationship {
            id,
            source_table,
            source_column,
            target_table,
            target_column,
        });
        self.relationships.len() - 1
    }

    /// Checks that a foreign-key spec points at an existing primary-key column.
    pub(super) fn reference_issue(&self, spec: &ColumnSpec) -> Option<String> {
        if !spec.is_foreign_key {
            return None;
        }
        let label = spec.name.trim();
        let (Some(table_id), Some(column_id)) = (&spec.reference_table, &spec.reference_column)
        else {
            return Some(format!(
                "foreign key '{label}' must name a referenced table and column"
            ));
        };
        let Some(table) = self.table(table_id) else {
            return Some(format!(
                "foreign key '{label}' references unknown table {table_id}"
            ));
        };
        match table.column(column_id) {
            None => Some(format!(
                "foreign key '{label}' references unknown column {column_id} of table '{}'",
                table.name
            )),
            Some(column) if !column.is_primary_key => Some(format!(
                "foreign key '{label}' must reference a primary key, but '{}.{}' is not one",
                table.name, column.name
            )),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn users_and_orders() -> (Schema, TableId, ColumnId, TableId, ColumnId) {
        let mut schema = Schema::new();
        let users = schema.create_table("users", 50.0, 50.0).id.clone();
        let users_id = schema
            .create_column(&users, ColumnSpec::new("id", "SERIAL").primary_key())
            .expect("users.id")
            .id
            .clone();
        let orders = schema.create_table("orders", 400.0, 50.0).id.clone();
        schema
            .create_column(&orders, ColumnSpec::new("id", "SERIAL").primary_key())
            .expect("orders.id");
        let user_id = schema
            .create_column(
                &orders,
                ColumnSpec::new("user_id", "INTEGER").references(&users, &users_id),
            )
            .expect("orders.user_id")
            .id
            .clone();
        (schema, users, users_id, orders, user_id)
    }

    #[test]
    fn generated_ids_are_unique_across_the_schema() {
        let mut schema = Schema::new();
        let mut seen = HashSet::new();
        for t in 0..5 {
            let table = schema.create_table(format!("t{t}"), 0.0, 0.0).id.clone();
            assert!(seen.insert(table.to_string()));
            for c in 0..4 {
                let column = schema
                    .create_column(&table, ColumnSpec::new(format!("c{c}"), "TEXT"))
                    .expect("column")
                    .id
                    .clone();
                assert!(seen.insert(column.to_string()));
            }
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn create_table_uses_unit_scale_and_creation_order() {
        let mut schema = Schema::new();
        schema.create_table("b", 1.0, 2.0);
        schema.create_table("a", 3.0, 4.0);

        let names: Vec<&str> = schema.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(schema.tables().all(|t| t.scale == 1.0));
    }

    #[test]
    fn foreign_key_column_creates_relationship() {
        let (schema, users, users_id, orders, user_id) = users_and_orders();

        let rels: Vec<&Relationship> = schema.relationships().collect();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].id.as_str(), "rel_1");
        assert_eq!(rels[0].source_table, orders);
        assert_eq!(rels[0].source_column, user_id);
        assert_eq!(rels[0].target_table, users);
        assert_eq!(rels[0].target_column, users_id);
        assert_eq!(schema.relationship(&rels[0].id), Some(rels[0]));
    }

    #[test]
    fn create_column_rejects_unknown_table() {
        let mut schema = Schema::new();

        let err = schema
            .create_column(&TableId::from("table_404"), ColumnSpec::new("id", "INT"))
            .unwrap_err();

        assert!(matches!(err, SchemaError::NotFound { kind: "table", .. }));
    }

    #[test]
    fn create_column_rejects_dangling_or_non_pk_references() {
        let (mut schema, users, _, orders, _) = users_and_orders();
        schema
            .create_column(&users, ColumnSpec::new("email", "TEXT"))
            .expect("email");
        let email = schema
            .table(&users)
            .and_then(|t| t.column_by_name("email"))
            .map(|c| c.id.clone())
            .expect("email id");

        let missing = ColumnSpec {
            is_foreign_key: true,
            ..ColumnSpec::new("owner", "INTEGER")
        };
        let unknown = ColumnSpec::new("owner", "INTEGER")
            .references(&TableId::from("table_99"), &ColumnId::from("column_1"));
        let non_pk = ColumnSpec::new("owner", "TEXT").references(&users, &email);

        for spec in [missing, unknown, non_pk] {
            let err = schema.create_column(&orders, spec).unwrap_err();
            assert!(matches!(err, SchemaError::Validation(_)), "{err}");
        }
        assert_eq!(schema.table(&orders).map(|t| t.columns.len()), Some(2));
        assert_eq!(schema.relationships().count(), 1);
    }

    #[test]
    fn removing_target_table_cascades_relationships() {
        let (mut schema, users, _, orders, _) = users_and_orders();

        let removed = schema.remove_table(&users).expect("users removed");

        assert_eq!(removed.name, "users");
        assert_eq!(schema.relationships().count(), 0);
        assert!(schema.table(&orders).is_some());
    }

    #[test]
    fn removing_source_column_cascades_relationships() {
        let (mut schema, _, _, orders, user_id) = users_and_orders();

        let removed = schema.remove_column(&orders, &user_id).expect("removed");

        assert_eq!(removed.name, "user_id");
        assert_eq!(schema.relationships().count(), 0);
    }

    #[test]
    fn removing_target_column_cascades_relationships() {
        let (mut schema, users, users_id, _, _) = users_and_orders();

        schema.remove_column(&users, &users_id).expect("removed");

        assert_eq!(schema.relationships().count(), 0);
    }

    #[test]
    fn removals_of_unknown_ids_are_noops() {
        let (mut schema, users, _, _, _) = users_and_orders();

        assert!(schema.remove_table(&TableId::from("table_77")).is_none());
        assert!(schema
            .remove_column(&users, &ColumnId::from("column_77"))
            .is_none());
        assert!(schema
            .remove_relationship(&RelationshipId::from("rel_77"))
            .is_none());
        assert_eq!(schema.table_count(), 2);
        assert_eq!(schema.relationships().count(), 1);
    }

    #[test]
    fn ids_are_not_recycled_after_delete() {
        let mut schema = Schema::new();
        let first = schema.create_table("a", 0.0, 0.0).id.clone();
        schema.remove_table(&first);

        let second = schema.create_table("b", 0.0, 0.0).id.clone();

        assert_eq!(second.as_str(), "table_2");
    }

    #[test]
    fn duplicate_relationship_for_source_pair_conflicts() {
        let (mut schema, users, users_id, orders, user_id) = users_and_orders();

        let err = schema
            .create_relationship(&orders, &user_id, &users, &users_id)
            .unwrap_err();

        assert!(matches!(err, SchemaError::Conflict(_)));
        assert_eq!(schema.relationships().count(), 1);
    }

    #[test]
    fn explicit_relationship_requires_resolvable_endpoints() {
        let (mut schema, users, users_id, orders, _) = users_and_orders();
        let notes = schema
            .create_column(&orders, ColumnSpec::new("note_id", "INTEGER"))
            .expect("note_id")
            .id
            .clone();

        let missing = schema.create_relationship(&orders, &ColumnId::from("column_99"), &users, &users_id);
        assert!(matches!(missing, Err(SchemaError::NotFound { kind: "column", .. })));

        let rel = schema
            .create_relationship(&orders, &notes, &users, &users_id)
            .expect("relationship")
            .id
            .clone();
        assert_eq!(rel.as_str(), "rel_2");
    }

    #[test]
    fn canvas_edits_validate_input() {
        let (mut schema, users, _, _, _) = users_and_orders();

        schema.move_table(&users, 10.0, 20.0).expect("move");
        schema.set_table_scale(&users, 1.5).expect("scale");
        schema.rename_table(&users, " members ").expect("rename");

        let table = schema.table(&users).expect("users");
        assert_eq!((table.x, table.y, table.scale), (10.0, 20.0, 1.5));
        assert_eq!(table.name, "members");

        assert!(schema.set_table_scale(&users, 0.0).is_err());
        assert!(schema.rename_table(&users, "  ").is_err());
        assert!(matches!(
            schema.move_table(&TableId::from("table_9"), 0.0, 0.0),
            Err(SchemaError::NotFound { .. })
        ));
    }

    #[test]
    fn table_by_name_returns_first_match() {
        let mut schema = Schema::new();
        let first = schema.create_table("dup", 0.0, 0.0).id.clone();
        schema.create_table("dup", 1.0, 1.0);

        assert_eq!(schema.table_by_name("dup").map(|t| &t.id), Some(&first));
        assert!(schema.table_by_name("missing").is_none());
    }

    #[test]
    fn column_reorder_delegates_through_schema() {
        let (mut schema, _, _, orders, user_id) = users_and_orders();

        schema.move_column(&orders, &user_id, 0).expect("move");
        let first = schema.table(&orders).map(|t| t.columns[0].name.clone());
        assert_eq!(first.as_deref(), Some("user_id"));

        let err = schema
            .update_columns_order(&TableId::from("table_50"), &[])
            .unwrap_err();
        assert!(matches!(err, SchemaError::NotFound { .. }));
    }
}
