//! Results produced by the pipeline stages.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::HashSet;

use super::catalog::ForeignKeyEdge;
use super::common::{Issue, Severity};
use super::request::Dialect;
use crate::error::PlanError;

/// How the effective schema was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// The connection reported it (`current_schema()` / `DATABASE()`).
    ConnectionDefault,
    /// First concrete entry of the PostgreSQL search path.
    SearchPath,
    /// The configured schema hint.
    Configured,
    /// The built-in `public` default.
    BuiltInDefault,
    /// Nothing usable was found.
    Unresolved,
}

/// Report of how the effective schema was chosen and whether it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResolution {
    pub resolved_schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configured_schema: Option<String>,
    pub exists: bool,
    pub method: ResolutionMethod,
}

impl SchemaResolution {
    pub fn new(
        resolved_schema: impl Into<String>,
        configured_schema: Option<String>,
        exists: bool,
        method: ResolutionMethod,
    ) -> Self {
        Self {
            resolved_schema: resolved_schema.into(),
            configured_schema,
            exists,
            method,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.method != ResolutionMethod::Unresolved
    }
}

/// Which filter rule removed a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Include patterns were given and none matched.
    NotIncluded,
    /// Matched a default system-table pattern.
    SystemTable,
    /// Matched a configured exclude pattern.
    ExcludePattern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedTable {
    pub name: String,
    pub reason: ExclusionReason,
    /// The pattern that decided, when one did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Outcome of table filtering. Both lists keep the catalog's relative order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub original_count: usize,
    pub included: Vec<String>,
    pub excluded: Vec<ExcludedTable>,
    pub included_count: usize,
    pub excluded_count: usize,
}

impl FilterResult {
    pub fn new(original_count: usize, included: Vec<String>, excluded: Vec<ExcludedTable>) -> Self {
        Self {
            original_count,
            included_count: included.len(),
            excluded_count: excluded.len(),
            included,
            excluded,
        }
    }

    pub fn excluded_names(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(|t| t.name.as_str())
    }
}

/// Ordered tables plus the foreign keys among them: the generator's only input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupPlan {
    schema: String,
    tables: Vec<String>,
    edges: Vec<ForeignKeyEdge>,
    circular_reference_tables: Vec<String>,
}

impl BackupPlan {
    /// Build a plan, checking that it is closed: tables are unique, every edge
    /// connects two planned tables, and circular tables are planned tables.
    pub fn new(
        schema: impl Into<String>,
        tables: Vec<String>,
        edges: Vec<ForeignKeyEdge>,
        circular_reference_tables: Vec<String>,
    ) -> Result<Self, PlanError> {
        let mut members = HashSet::with_capacity(tables.len());
        for table in &tables {
            if !members.insert(table.as_str()) {
                return Err(PlanError::DuplicateTable(table.clone()));
            }
        }

        for edge in &edges {
            for endpoint in [&edge.child_table, &edge.parent_table] {
                if !members.contains(endpoint.as_str()) {
                    return Err(PlanError::DanglingEdge {
                        constraint: edge.constraint_name.clone(),
                        table: endpoint.clone(),
                    });
                }
            }
        }

        if let Some(stray) = circular_reference_tables
            .iter()
            .find(|t| !members.contains(t.as_str()))
        {
            return Err(PlanError::UnknownCircularTable(stray.clone()));
        }

        Ok(Self {
            schema: schema.into(),
            tables,
            edges,
            circular_reference_tables,
        })
    }

    /// For callers that built the parts closed by construction.
    pub(crate) fn from_parts(
        schema: String,
        tables: Vec<String>,
        edges: Vec<ForeignKeyEdge>,
        circular_reference_tables: Vec<String>,
    ) -> Self {
        debug_assert!(Self::new(
            schema.clone(),
            tables.clone(),
            edges.clone(),
            circular_reference_tables.clone()
        )
        .is_ok());
        Self {
            schema,
            tables,
            edges,
            circular_reference_tables,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn edges(&self) -> &[ForeignKeyEdge] {
        &self.edges
    }

    pub fn circular_reference_tables(&self) -> &[String] {
        &self.circular_reference_tables
    }

    pub fn has_circular_references(&self) -> bool {
        !self.circular_reference_tables.is_empty()
    }

    /// Position of `table` in the emission order.
    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t == table)
    }
}

/// Which script layout was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Structures, data in dependency order, then constraints.
    Phased,
    /// Per-table blocks in catalog order; dependency analysis failed.
    Fallback,
    /// No tables survived filtering.
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub tables: usize,
    pub rows: u64,
    pub constraints: usize,
}

/// Result object of one backup run.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub dialect: Dialect,
    pub schema: SchemaResolution,
    pub filter: FilterResult,
    /// Present when dependency analysis succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<BackupPlan>,
    pub mode: GenerationMode,
    pub stats: GenerationStats,
    pub issues: Vec<Issue>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BackupReport {
    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    pub fn has_issue(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}
