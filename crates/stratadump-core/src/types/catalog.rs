//! Catalog metadata as seen by the pipeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One column of a value row as read from the database, rendered to text.
///
/// `None` is SQL `NULL`. Binary columns arrive hex-encoded.
pub type CellValue = Option<String>;

/// A foreign-key relationship: `child_table.child_column` references
/// `parent_table.parent_column`, so the parent must be restored first.
///
/// Composite keys arrive as one edge per column pair sharing a constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyEdge {
    pub child_table: String,
    pub parent_table: String,
    pub constraint_name: String,
    pub child_column: String,
    pub parent_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyEdge {
    pub fn new(
        child_table: impl Into<String>,
        parent_table: impl Into<String>,
        constraint_name: impl Into<String>,
        child_column: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            child_table: child_table.into(),
            parent_table: parent_table.into(),
            constraint_name: constraint_name.into(),
            child_column: child_column.into(),
            parent_column: parent_column.into(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn with_actions(
        mut self,
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    ) -> Self {
        self.on_delete = on_delete;
        self.on_update = on_update;
        self
    }

    pub fn is_self_reference(&self) -> bool {
        self.child_table == self.parent_table
    }
}

/// `ON DELETE` / `ON UPDATE` behaviour of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Parse a catalog rule. Accepts the `information_schema` spelling
    /// (`SET NULL`) and the single-letter `pg_constraint` codes.
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" | "A" => Some(Self::NoAction),
            "RESTRICT" | "R" => Some(Self::Restrict),
            "CASCADE" | "C" => Some(Self::Cascade),
            "SET NULL" | "N" => Some(Self::SetNull),
            "SET DEFAULT" | "D" => Some(Self::SetDefault),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A foreign-key constraint with all of its column pairs, rebuilt from edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub child_table: String,
    pub parent_table: String,
    pub child_columns: Vec<String>,
    pub parent_columns: Vec<String>,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyConstraint {
    /// Merge edges that share a child table and constraint name into one
    /// constraint, keeping first-seen order for constraints and columns.
    pub fn group(edges: &[ForeignKeyEdge]) -> Vec<Self> {
        let mut constraints: Vec<Self> = Vec::new();

        for edge in edges {
            let existing = constraints.iter_mut().find(|c| {
                c.child_table == edge.child_table
                    && c.name == edge.constraint_name
                    && c.parent_table == edge.parent_table
            });

            match existing {
                Some(constraint) => {
                    constraint.child_columns.push(edge.child_column.clone());
                    constraint.parent_columns.push(edge.parent_column.clone());
                }
                None => constraints.push(Self {
                    name: edge.constraint_name.clone(),
                    child_table: edge.child_table.clone(),
                    parent_table: edge.parent_table.clone(),
                    child_columns: vec![edge.child_column.clone()],
                    parent_columns: vec![edge.parent_column.clone()],
                    on_delete: edge.on_delete,
                    on_update: edge.on_update,
                }),
            }
        }

        constraints
    }
}

/// How a column draws its values from a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// `GENERATED ALWAYS AS IDENTITY`
    Always,
    /// `GENERATED BY DEFAULT AS IDENTITY` / `AUTO_INCREMENT`
    ByDefault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    /// Type as the catalog formats it, e.g. `character varying(255)`.
    pub data_type: String,
    pub nullable: bool,
    /// Default expression as the catalog formats it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityKind>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            identity: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_identity(mut self, identity: IdentityKind) -> Self {
        self.identity = Some(identity);
        self
    }

    /// True when the column is fed by a sequence (`serial` or identity).
    pub fn is_sequence_backed(&self) -> bool {
        self.identity.is_some()
            || self
                .default
                .as_deref()
                .is_some_and(|d| d.trim_start().to_ascii_lowercase().starts_with("nextval("))
    }
}

/// A primary-key or unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl KeyConstraint {
    pub fn new(name: Option<String>, columns: Vec<String>) -> Self {
        Self { name, columns }
    }
}

/// Everything the renderer needs to recreate and refill one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<KeyConstraint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<KeyConstraint>,
    /// Every foreign key declared on the table, including ones pointing at
    /// tables outside the backup.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyEdge>,
    /// The server's own `CREATE TABLE` text, when the engine exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_ddl: Option<String>,
    /// Set when the table's foreign keys could not be read; `foreign_keys`
    /// is then empty. Holds the underlying error text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_keys_unavailable: Option<String>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: None,
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            native_ddl: None,
            foreign_keys_unavailable: None,
        }
    }

    pub fn with_primary_key(mut self, name: Option<&str>, columns: &[&str]) -> Self {
        self.primary_key = Some(KeyConstraint::new(
            name.map(str::to_string),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn with_unique(mut self, name: Option<&str>, columns: &[&str]) -> Self {
        self.unique_constraints.push(KeyConstraint::new(
            name.map(str::to_string),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn with_foreign_key(mut self, edge: ForeignKeyEdge) -> Self {
        self.foreign_keys.push(edge);
        self
    }

    pub fn with_native_ddl(mut self, ddl: impl Into<String>) -> Self {
        self.native_ddl = Some(ddl.into());
        self
    }

    /// Drop the foreign keys and record why they are missing.
    pub fn without_foreign_keys(mut self, cause: impl std::fmt::Display) -> Self {
        self.foreign_keys.clear();
        self.foreign_keys_unavailable = Some(cause.to_string());
        self
    }

    /// True when the script would inline foreign keys from `foreign_keys`
    /// rather than from native DDL, and those could not be read.
    pub fn loses_inline_foreign_keys(&self) -> bool {
        self.foreign_keys_unavailable.is_some() && self.native_ddl.is_none()
    }
}

/// Literal rendering class of a column, derived from its catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Binary,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referential_action_parsing() {
        assert_eq!(
            ReferentialAction::from_catalog("SET NULL"),
            Some(ReferentialAction::SetNull)
        );
        assert_eq!(
            ReferentialAction::from_catalog("c"),
            Some(ReferentialAction::Cascade)
        );
        assert_eq!(
            ReferentialAction::from_catalog(" no action "),
            Some(ReferentialAction::NoAction)
        );
        assert_eq!(ReferentialAction::from_catalog("SOMETIMES"), None);
    }

    #[test]
    fn test_group_merges_composite_keys() {
        let edges = vec![
            ForeignKeyEdge::new("line", "header", "line_header_fk", "doc_id", "id"),
            ForeignKeyEdge::new("line", "product", "line_product_fk", "product_id", "id"),
            ForeignKeyEdge::new("line", "header", "line_header_fk", "doc_rev", "rev"),
        ];

        let grouped = ForeignKeyConstraint::group(&edges);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "line_header_fk");
        assert_eq!(grouped[0].child_columns, vec!["doc_id", "doc_rev"]);
        assert_eq!(grouped[0].parent_columns, vec!["id", "rev"]);
        assert_eq!(grouped[1].child_columns, vec!["product_id"]);
    }

    #[test]
    fn test_sequence_backed_columns() {
        let serial = ColumnDefinition::new("id", "integer")
            .with_default("nextval('users_id_seq'::regclass)");
        let identity = ColumnDefinition::new("id", "bigint").with_identity(IdentityKind::Always);
        let plain = ColumnDefinition::new("name", "text").with_default("'anon'::text");

        assert!(serial.is_sequence_backed());
        assert!(identity.is_sequence_backed());
        assert!(!plain.is_sequence_backed());
    }
}
