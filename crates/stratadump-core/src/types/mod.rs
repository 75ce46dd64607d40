//! Types for backup requests, catalog metadata and run results.
//!
//! Everything here is constructed fresh for a single run from live catalog
//! queries and dropped when the run ends.

mod catalog;
mod common;
mod request;
mod response;

// Re-export all public types
pub use catalog::{
    CellValue, ColumnDefinition, ColumnKind, ForeignKeyConstraint, ForeignKeyEdge, IdentityKind,
    KeyConstraint, ReferentialAction, TableDefinition,
};
pub use common::{issue_codes, Issue, Severity, Stage};
pub use request::{BackupOptions, Dialect};
pub use response::{
    BackupPlan, BackupReport, ExcludedTable, ExclusionReason, FilterResult, GenerationMode,
    GenerationStats, ResolutionMethod, SchemaResolution,
};
