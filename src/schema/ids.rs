use std::fmt;

use serde::{Deserialize, Serialize};

/// Entity families that draw identifiers from an [`IdGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Table,
    Column,
    Relationship,
}

impl IdKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Relationship => "rel",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Relationship => "relationship",
        }
    }
}

macro_rules! designer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

designer_id!(
    /// Identifier of a table inside one schema, e.g. `table_3`.
    TableId
);
designer_id!(
    /// Identifier of a column, unique across the whole schema, e.g. `column_12`.
    ColumnId
);
designer_id!(
    /// Identifier of a foreign-key relationship, e.g. `rel_1`.
    RelationshipId
);

/// Issues `"{prefix}_{n}"` identifiers, one monotonically increasing counter per kind.
///
/// Counters start at 1 and never move backwards, so an identifier released by a
/// delete is never handed out again for the lifetime of the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdGenerator {
    tables: u64,
    columns: u64,
    relationships: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, kind: IdKind) -> String {
        let counter = self.counter_mut(kind);
        *counter += 1;
        format!("{}_{}", kind.prefix(), counter)
    }

    pub fn next_table_id(&mut self) -> TableId {
        TableId(self.next(IdKind::Table))
    }

    pub fn next_column_id(&mut self) -> ColumnId {
        ColumnId(self.next(IdKind::Column))
    }

    pub fn next_relationship_id(&mut self) -> RelationshipId {
        RelationshipId(self.next(IdKind::Relationship))
    }

    /// Moves the counter for `kind` past an identifier that was issued elsewhere
    /// (typically by a previous session whose schema is being hydrated).
    ///
    /// Identifiers that do not follow the `"{prefix}_{n}"` shape are ignored; they
    /// can never collide with generated ones.
    pub fn observe(&mut self, kind: IdKind, id: &str) {
        let Some(n) = id
            .strip_prefix(kind.prefix())
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|digits| digits.parse::<u64>().ok())
        else {
            return;
        };
        let counter = self.counter_mut(kind);
        if n > *counter {
            *counter = n;
        }
    }

    fn counter_mut(&mut self, kind: IdKind) -> &mut u64 {
        match kind {
            IdKind::Table => &mut self.tables,
            IdKind::Column => &mut self.columns,
            IdKind::Relationship => &mut self.relationships,
        }
    }
}
