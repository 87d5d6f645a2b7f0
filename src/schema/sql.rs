//! PostgreSQL DDL export.
//!
//! Output is a pure function of the schema and [`SqlOptions`]: tables are emitted
//! in creation order as `CREATE TABLE` statements, followed by one
//! `ALTER TABLE ... ADD CONSTRAINT` per resolvable relationship.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::aggregate::Schema;
use super::model::{Column, Relationship, Table};

pub const SQL_HEADER: &str = "-- SQL schema generated by Schema Designer";

/// Identifiers that PostgreSQL refuses unquoted. Kept sorted.
pub const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "between", "binary", "both", "case", "cast", "check", "collate",
    "column", "constraint", "create", "cross", "current_catalog", "current_date",
    "current_role", "current_schema", "current_time", "current_timestamp", "current_user",
    "default", "deferrable", "desc", "distinct", "do", "else", "end", "except", "false",
    "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group", "having",
    "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull", "join",
    "lateral", "leading", "left", "like", "limit", "localtime", "localtimestamp",
    "natural", "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "table", "tablesample", "then", "to",
    "trailing", "true", "union", "unique", "user", "using", "variadic", "verbose", "when",
    "where", "window", "with",
];

/// Default expressions that are passed through verbatim even on text columns.
const SPECIAL_DEFAULTS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "NOW()",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "NULL",
    "TRUE",
    "FALSE",
];

/// Type fragments whose defaults are string literals.
const QUOTED_DEFAULT_TYPES: &[&str] = &["VARCHAR", "CHAR", "TEXT", "DATE", "TIME"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlOptions {
    /// Adds a `-- Generated at:` line to the header when set.
    pub generated_at: Option<DateTime<Utc>>,
}

impl SqlOptions {
    pub fn generated_now() -> Self {
        Self {
            generated_at: Some(Utc::now()),
        }
    }
}

pub fn is_reserved_word(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    RESERVED_WORDS.binary_search(&lower.as_str()).is_ok()
}

/// Quotes an identifier when PostgreSQL would not accept it bare.
pub fn escape_name(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && !is_reserved_word(name);
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

pub fn generate_sql(schema: &Schema, options: &SqlOptions) -> String {
    let mut output = String::new();

    output.push_str(SQL_HEADER);
    output.push('\n');
    if let Some(at) = options.generated_at {
        output.push_str(&format!(
            "-- Generated at: {}\n",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    output.push('\n');

    for table in schema.tables() {
        write_table(&mut output, table);
    }

    let mut constraint_names = HashSet::new();
    for rel in schema.relationships() {
        write_foreign_key(&mut output, schema, rel, &mut constraint_names);
    }

    output
}

fn write_table(output: &mut String, table: &Table) {
    output.push_str(&format!("-- Table: {}\n", table.name));
    output.push_str(&format!("CREATE TABLE {} (\n", escape_name(&table.name)));

    let definitions: Vec<String> = table.columns.iter().map(column_definition).collect();
    if !definitions.is_empty() {
        output.push_str(&definitions.join(",\n"));
        output.push('\n');
    }
    output.push_str(");\n\n");
}

fn column_definition(column: &Column) -> String {
    let mut definition = format!("  {} {}", escape_name(&column.name), column.data_type);

    if column.is_primary_key {
        definition.push_str(" PRIMARY KEY");
    }
    // primary keys are implicitly NOT NULL
    if column.not_null && !column.is_primary_key {
        definition.push_str(" NOT NULL");
    }
    if let Some(value) = column.default_value.as_deref() {
        if !value.trim().is_empty() {
            definition.push_str(" DEFAULT ");
            definition.push_str(&default_literal(value, &column.data_type));
        }
    }

    definition
}

fn default_literal(value: &str, data_type: &str) -> String {
    let upper_value = value.to_uppercase();
    if SPECIAL_DEFAULTS.iter().any(|token| upper_value.contains(token)) {
        return value.to_string();
    }

    let upper_type = data_type.to_uppercase();
    if QUOTED_DEFAULT_TYPES.iter().any(|fragment| upper_type.contains(fragment)) {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

fn write_foreign_key(
    output: &mut String,
    schema: &Schema,
    rel: &Relationship,
    constraint_names: &mut HashSet<String>,
) {
    let endpoints = schema.table(&rel.source_table).zip(schema.table(&rel.target_table));
    let Some((source_table, target_table)) = endpoints else {
        debug!(relationship = %rel.id, "skipping foreign key with a missing table");
        return;
    };
    let columns = source_table
        .column(&rel.source_column)
        .zip(target_table.column(&rel.target_column));
    let Some((source_column, target_column)) = columns else {
        debug!(relationship = %rel.id, "skipping foreign key with a missing column");
        return;
    };

    let constraint = unique_constraint_name(
        format!("fk_{}_{}", source_table.name, source_column.name),
        constraint_names,
    );

    output.push_str(&format!(
        "-- Foreign key: {}.{} -> {}.{}\n",
        source_table.name, source_column.name, target_table.name, target_column.name
    ));
    output.push_str(&format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});\n\n",
        escape_name(&source_table.name),
        escape_name(&constraint),
        escape_name(&source_column.name),
        escape_name(&target_table.name),
        escape_name(&target_column.name),
    ));
}

fn unique_constraint_name(base: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.clone();
    let mut suffix = 2;
    while !taken.insert(candidate.to_lowercase()) {
        candidate = format!("{base}_{suffix}");
        suffix += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::schema::model::ColumnSpec;
    use crate::schema::{ColumnId, RelationshipId, SchemaSnapshot, TableId};

    fn users_orders() -> (Schema, TableId) {
        let mut schema = Schema::new();
        let users = schema.create_table("users", 50.0, 50.0).id.clone();
        let id = schema
            .create_column(&users, ColumnSpec::new("id", "SERIAL").primary_key())
            .expect("users.id")
            .id
            .clone();
        schema
            .create_column(&users, ColumnSpec::new("email", "VARCHAR(255)").not_null())
            .expect("users.email");
        let orders = schema.create_table("orders", 400.0, 50.0).id.clone();
        schema
            .create_column(&orders, ColumnSpec::new("id", "SERIAL").primary_key())
            .expect("orders.id");
        schema
            .create_column(
                &orders,
                ColumnSpec::new("user_id", "INTEGER")
                    .references(&users, &id)
                    .not_null(),
            )
            .expect("orders.user_id");
        (schema, users)
    }

    /// Reads the column lines of every CREATE TABLE back into
    /// `(table, [(name, type, primary_key, not_null)])`.
    fn parse_tables(sql: &str) -> Vec<(String, Vec<(String, String, bool, bool)>)> {
        let mut tables = Vec::new();
        let mut current: Option<(String, Vec<(String, String, bool, bool)>)> = None;
        for line in sql.lines() {
            if let Some(rest) = line.strip_prefix("CREATE TABLE ") {
                let name = rest.trim_end_matches(" (").trim_matches('"').to_string();
                current = Some((name, Vec::new()));
            } else if line == ");" {
                tables.extend(current.take());
            } else if let (Some(body), Some((_, columns))) =
                (line.strip_prefix("  "), current.as_mut())
            {
                let body = body.trim_end_matches(',');
                let mut parts = body.split_whitespace();
                let name = parts.next().unwrap_or_default().trim_matches('"').to_string();
                let data_type = parts.next().unwrap_or_default().to_string();
                columns.push((
                    name,
                    data_type,
                    body.contains(" PRIMARY KEY"),
                    body.contains(" NOT NULL"),
                ));
            }
        }
        tables
    }

    #[test]
    fn reserved_word_list_is_sorted_and_complete() {
        assert_eq!(RESERVED_WORDS.len(), 99);
        assert!(RESERVED_WORDS.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn escaping_rules() {
        assert_eq!(escape_name("users"), "users");
        assert_eq!(escape_name("order"), "\"order\"");
        assert_eq!(escape_name("ORDER"), "\"ORDER\"");
        assert_eq!(escape_name("first name"), "\"first name\"");
        assert_eq!(escape_name("2fa"), "\"2fa\"");
        assert_eq!(escape_name("say\"hi"), "\"say\"\"hi\"");
        assert_eq!(escape_name(""), "\"\"");
        assert_eq!(escape_name("user_id"), "user_id");
    }

    #[test]
    fn scenario_users_orders() {
        let (schema, _) = users_orders();

        let sql = generate_sql(&schema, &SqlOptions::default());

        let expected = "\
-- SQL schema generated by Schema Designer

-- Table: users
CREATE TABLE users (
  id SERIAL PRIMARY KEY,
  email VARCHAR(255) NOT NULL
);

-- Table: orders
CREATE TABLE orders (
  id SERIAL PRIMARY KEY,
  user_id INTEGER NOT NULL
);

-- Foreign key: orders.user_id -> users.id
ALTER TABLE orders ADD CONSTRAINT fk_orders_user_id FOREIGN KEY (user_id) REFERENCES users (id);

";
        assert_eq!(sql, expected);
    }

    #[test]
    fn deleting_referenced_table_drops_foreign_key() {
        let (mut schema, users) = users_orders();
        schema.remove_table(&users);

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert!(!sql.contains("CREATE TABLE users"));
        assert!(sql.contains("CREATE TABLE orders ("));
        assert!(!sql.contains("ALTER TABLE"));
    }

    #[test]
    fn create_table_column_lists_round_trip() {
        let (mut schema, _) = users_orders();
        let order = schema.create_table("order", 0.0, 0.0).id.clone();
        schema
            .create_column(&order, ColumnSpec::new("select", "TEXT").not_null())
            .expect("select");

        let sql = generate_sql(&schema, &SqlOptions::default());
        let parsed = parse_tables(&sql);

        let expected: Vec<(String, Vec<(String, String, bool, bool)>)> = schema
            .tables()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| {
                        (
                            c.name.clone(),
                            c.data_type.clone(),
                            c.is_primary_key,
                            c.not_null && !c.is_primary_key,
                        )
                    })
                    .collect();
                (table.name.clone(), columns)
            })
            .collect();
        assert_eq!(parsed, expected);
        assert!(sql.contains("CREATE TABLE \"order\" (\n  \"select\" TEXT NOT NULL\n);"));
    }

    #[test]
    fn defaults_are_quoted_by_type() {
        let mut schema = Schema::new();
        let table = schema.create_table("accounts", 0.0, 0.0).id.clone();
        for spec in [
            ColumnSpec::new("status", "VARCHAR(50)").default_value("active"),
            ColumnSpec::new("created_at", "TIMESTAMP").default_value("CURRENT_TIMESTAMP"),
            ColumnSpec::new("touched", "timestamptz").default_value("now()"),
            ColumnSpec::new("score", "INTEGER").default_value("0"),
            ColumnSpec::new("note", "TEXT").default_value("it's"),
            ColumnSpec::new("blank", "TEXT").default_value("   "),
        ] {
            schema.create_column(&table, spec).expect("column");
        }

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert!(sql.contains("  status VARCHAR(50) DEFAULT 'active',"));
        assert!(sql.contains("  created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,"));
        assert!(sql.contains("  touched timestamptz DEFAULT now(),"));
        assert!(sql.contains("  score INTEGER DEFAULT 0,"));
        assert!(sql.contains("  note TEXT DEFAULT 'it''s',"));
        assert!(sql.contains("  blank TEXT\n);"));
    }

    #[test]
    fn primary_key_suppresses_not_null() {
        let mut schema = Schema::new();
        let table = schema.create_table("t", 0.0, 0.0).id.clone();
        schema
            .create_column(&table, ColumnSpec::new("id", "INT").primary_key().not_null())
            .expect("id");

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert!(sql.contains("  id INT PRIMARY KEY\n);"));
    }

    #[test]
    fn empty_table_has_empty_column_list() {
        let mut schema = Schema::new();
        schema.create_table("empty", 0.0, 0.0);

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert!(sql.ends_with("-- Table: empty\nCREATE TABLE empty (\n);\n\n"));
    }

    #[test]
    fn header_includes_injected_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().expect("timestamp");
        let options = SqlOptions {
            generated_at: Some(at),
        };

        let sql = generate_sql(&Schema::new(), &options);

        assert_eq!(
            sql,
            "-- SQL schema generated by Schema Designer\n-- Generated at: 2024-05-01T12:30:00Z\n\n"
        );
    }

    #[test]
    fn dangling_relationships_are_skipped() {
        let (schema, _) = users_orders();
        let mut snapshot = schema.snapshot();
        snapshot.relationships.insert(
            0,
            Relationship {
                id: RelationshipId::from("rel_9"),
                source_table: TableId::from("table_2"),
                source_column: ColumnId::from("column_404"),
                target_table: TableId::from("table_1"),
                target_column: ColumnId::from("column_1"),
            },
        );
        let schema = Schema::from_snapshot(snapshot).expect("hydrate");

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert_eq!(sql.matches("ALTER TABLE").count(), 1);
    }

    #[test]
    fn colliding_constraint_names_get_suffixes() {
        let snapshot: SchemaSnapshot = serde_json::from_value(serde_json::json!({
            "tables": [
                {"id": "table_1", "name": "a", "columns": [
                    {"id": "column_1", "name": "id", "dataType": "INT", "isPrimaryKey": true}
                ]},
                {"id": "table_2", "name": "a_b", "columns": [
                    {"id": "column_2", "name": "c", "dataType": "INT"}
                ]},
                {"id": "table_3", "name": "a", "columns": [
                    {"id": "column_3", "name": "b_c", "dataType": "INT"}
                ]}
            ],
            "relationships": [
                {"id": "rel_1", "sourceTable": "table_2", "sourceColumn": "column_2",
                 "targetTable": "table_1", "targetColumn": "column_1"},
                {"id": "rel_2", "sourceTable": "table_3", "sourceColumn": "column_3",
                 "targetTable": "table_1", "targetColumn": "column_1"}
            ]
        }))
        .expect("snapshot");
        let schema = Schema::from_snapshot(snapshot).expect("hydrate");

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert!(sql.contains("ADD CONSTRAINT fk_a_b_c FOREIGN KEY (c)"));
        assert!(sql.contains("ADD CONSTRAINT fk_a_b_c_2 FOREIGN KEY (b_c)"));
    }

    #[test]
    fn reserved_names_are_quoted_in_constraints() {
        let mut schema = Schema::new();
        let user = schema.create_table("user", 0.0, 0.0).id.clone();
        let id = schema
            .create_column(&user, ColumnSpec::new("id", "INT").primary_key())
            .expect("id")
            .id
            .clone();
        let group = schema.create_table("group", 0.0, 0.0).id.clone();
        schema
            .create_column(&group, ColumnSpec::new("owner", "INT").references(&user, &id))
            .expect("owner");

        let sql = generate_sql(&schema, &SqlOptions::default());

        assert!(sql.contains(
            "ALTER TABLE \"group\" ADD CONSTRAINT fk_group_owner FOREIGN KEY (owner) REFERENCES \"user\" (id);"
        ));
    }
}
