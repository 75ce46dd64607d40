pub mod catalog;
pub mod dependency;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod generator;
pub mod identifier;
pub mod orchestrator;
pub mod pattern;
pub mod schema_resolver;
pub mod types;

// Re-export main types and functions
pub use catalog::{BackupSource, CatalogReader, RowVisitor, TableSource};
pub use dependency::{analyze, order_tables, restrict_edges, TableOrdering};
pub use dialect::{ForeignKeys, InsertTemplate};
pub use error::{
    BackupError, BoxError, CatalogError, DependencyQueryError, IdentifierKind, PlanError,
};
pub use filter::{filter_tables, TableFilter};
pub use generator::{generate_empty, generate_fallback, generate_phased, ScriptContext};
pub use identifier::{ensure_safe_identifier, is_safe_identifier};
pub use orchestrator::run_backup;
pub use pattern::{wildcard_to_regex, PatternSet, WildcardPattern};
pub use schema_resolver::{resolve as resolve_schema, SchemaHint};

// Re-export types explicitly
pub use types::{
    // Issue codes
    issue_codes,
    // Request types
    BackupOptions,
    // Response types
    BackupPlan,
    BackupReport,
    // Catalog types
    CellValue,
    ColumnDefinition,
    ColumnKind,
    Dialect,
    ExcludedTable,
    ExclusionReason,
    FilterResult,
    ForeignKeyConstraint,
    ForeignKeyEdge,
    GenerationMode,
    GenerationStats,
    IdentityKind,
    Issue,
    KeyConstraint,
    ReferentialAction,
    ResolutionMethod,
    SchemaResolution,
    Severity,
    Stage,
    TableDefinition,
};
