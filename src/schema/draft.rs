use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::aggregate::Schema;
use super::error::{SchemaError, SchemaResult};
use super::ids::{ColumnId, TableId};
use super::model::{Column, ColumnSpec};

/// Everything the table editor submits in one go.
///
/// Without `table_id` the draft creates a table at `(x, y)`. With it, the draft
/// replaces the name and column list of that table; the canvas position of an
/// existing table is left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDraft {
    #[serde(default)]
    pub table_id: Option<TableId>,
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl TableDraft {
    pub fn create(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            ..Self::default()
        }
    }

    pub fn edit(table_id: &TableId, name: impl Into<String>) -> Self {
        Self {
            table_id: Some(table_id.clone()),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }
}

impl Schema {
    /// Applies a [`TableDraft`] atomically.
    ///
    /// Every problem in the draft is reported in one `Validation` error and the
    /// schema is left untouched. On success the table's outbound relationships
    /// match its foreign-key columns exactly.
    pub fn save_table(&mut self, draft: TableDraft) -> SchemaResult<TableId> {
        let issues = self.draft_issues(&draft);
        if !issues.is_empty() {
            return Err(SchemaError::Validation(issues));
        }

        let name = draft.name.trim().to_string();
        let table_id = match &draft.table_id {
            Some(id) => {
                self.table_mut(id)?.name = name;
                id.clone()
            }
            None => self.create_table(name, draft.x, draft.y).id.clone(),
        };

        let kept: HashSet<ColumnId> = if draft.table_id.is_some() {
            draft.columns.iter().filter_map(|spec| spec.id.clone()).collect()
        } else {
            HashSet::new()
        };
        let dropped: Vec<ColumnId> = self
            .table(&table_id)
            .map(|table| {
                table
                    .columns
                    .iter()
                    .filter(|column| !kept.contains(&column.id))
                    .map(|column| column.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        for column_id in &dropped {
            self.remove_column(&table_id, column_id);
        }

        let mut columns = Vec::with_capacity(draft.columns.len());
        for spec in draft.columns {
            let id = match spec.id.clone().filter(|id| kept.contains(id)) {
                Some(id) => id,
                None => self.ids.next_column_id(),
            };
            columns.push(Column::from_spec(id, spec));
        }
        self.table_mut(&table_id)?.columns = columns;

        self.rederive_outbound(&table_id);
        Ok(table_id)
    }

    /// Drops outbound relationships that no longer match a foreign-key column and
    /// creates the missing ones. Matching relationships keep their id.
    fn rederive_outbound(&mut self, table_id: &TableId) {
        let Some(table) = self.table(table_id) else {
            return;
        };
        let wanted: Vec<(ColumnId, TableId, ColumnId)> = table
            .columns
            .iter()
            .filter_map(|column| {
                column
                    .reference()
                    .map(|(t, c)| (column.id.clone(), t.clone(), c.clone()))
            })
            .collect();

        self.relationships.retain(|rel| {
            &rel.source_table != table_id
                || wanted.iter().any(|(source, target_table, target_column)| {
                    &rel.source_column == source
                        && &rel.target_table == target_table
                        && &rel.target_column == target_column
                })
        });

        for (source, target_table, target_column) in wanted {
            let exists = self
                .relationships
                .iter()
                .any(|rel| rel.has_source(table_id, &source));
            if !exists {
                self.push_relationship(table_id.clone(), source, target_table, target_column);
            }
        }
    }

    fn draft_issues(&self, draft: &TableDraft) -> Vec<String> {
        let mut issues = Vec::new();

        let existing = match &draft.table_id {
            Some(id) => match self.table(id) {
                Some(table) => Some(table),
                None => {
                    issues.push(format!("table {id} does not exist"));
                    None
                }
            },
            None => None,
        };

        let name = draft.name.trim();
        if name.is_empty() {
            issues.push("table name must not be blank".to_string());
        } else if self.tables().any(|table| {
            table.name.eq_ignore_ascii_case(name) && Some(&table.id) != draft.table_id.as_ref()
        }) {
            issues.push(format!("a table named '{name}' already exists"));
        }

        if draft.columns.is_empty() {
            issues.push("a table needs at least one column".to_string());
        }

        let mut names: HashMap<String, usize> = HashMap::new();
        let mut ids = HashSet::new();
        for (index, spec) in draft.columns.iter().enumerate() {
            let position = index + 1;
            let column_name = spec.name.trim();
            if column_name.is_empty() {
                issues.push(format!("column #{position} has no name"));
            } else {
                let first = *names.entry(column_name.to_lowercase()).or_insert(position);
                if first != position {
                    issues.push(format!(
                        "column #{position} '{column_name}' duplicates the name of column #{first}"
                    ));
                }
            }
            if spec.data_type.trim().is_empty() {
                issues.push(format!("column #{position} has no data type"));
            }

            if let (Some(id), Some(table)) = (&spec.id, existing) {
                if table.column(id).is_none() {
                    issues.push(format!(
                        "column {id} does not belong to table '{}'",
                        table.name
                    ));
                } else if !ids.insert(id) {
                    issues.push(format!("column {id} is listed more than once"));
                }
            }

            if let Some(issue) = self.draft_reference_issue(draft, spec) {
                issues.push(issue);
            }
        }

        if let Some(table) = existing {
            issues.extend(self.broken_inbound_issues(draft, table.id.clone()));
        }

        issues
    }

    /// Self-references inside an edited table are checked against the draft,
    /// everything else against the current schema.
    fn draft_reference_issue(&self, draft: &TableDraft, spec: &ColumnSpec) -> Option<String> {
        let own_table = draft.table_id.as_ref();
        if !spec.is_foreign_key || own_table.is_none() || spec.reference_table.as_ref() != own_table
        {
            return self.reference_issue(spec);
        }
        let label = spec.name.trim();
        let target = spec.reference_column.as_ref().and_then(|target| {
            draft
                .columns
                .iter()
                .find(|candidate| candidate.id.as_ref() == Some(target))
        });
        match target {
            None => Some(format!(
                "foreign key '{label}' references a column that is not part of the table"
            )),
            Some(target) if !target.is_primary_key => Some(format!(
                "foreign key '{label}' must reference a primary key, but '{}' is not one",
                target.name.trim()
            )),
            Some(_) => None,
        }
    }

    /// A kept column that other tables point at must stay a primary key.
    fn broken_inbound_issues(&self, draft: &TableDraft, table_id: TableId) -> Vec<String> {
        self.relationships
            .iter()
            .filter(|rel| rel.target_table == table_id && rel.source_table != table_id)
            .filter_map(|rel| {
                let spec = draft
                    .columns
                    .iter()
                    .find(|spec| spec.id.as_ref() == Some(&rel.target_column))?;
                if spec.is_primary_key {
                    return None;
                }
                let source = self.table(&rel.source_table)?;
                Some(format!(
                    "column '{}' is referenced by table '{}' and must stay a primary key",
                    spec.name.trim(),
                    source.name
                ))
            })
            .collect()
    }
}
