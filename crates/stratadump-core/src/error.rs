//! Error types for the backup pipeline.
//!
//! # Error Handling Strategy
//!
//! Two complementary patterns are used, mirroring how a run degrades:
//!
//! - [`BackupError`]: fatal conditions. Returned as `Result<T, BackupError>` and
//!   abort the run (unreachable catalog before tables are listed, unsafe
//!   identifiers, unreadable rows, a failing sink).
//!
//! - [`crate::types::Issue`]: non-fatal conditions (schema not confirmed to
//!   exist, dependency analysis failure, empty table set). These are collected
//!   in the [`crate::types::BackupReport`] so the caller decides how to surface
//!   them.
//!
//! [`DependencyQueryError`] sits between the two: the analyzer returns it as an
//! ordinary `Result`, and the orchestrator turns it into an issue plus a
//! fallback script instead of failing.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

use crate::types::Dialect;

/// Boxed source error from a catalog adapter.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A catalog query or row read failed.
#[derive(Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct CatalogError {
    /// Catalog operation that failed, e.g. `list_foreign_keys`.
    pub operation: &'static str,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl CatalogError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an adapter error, keeping it as the source.
    pub fn from_source(operation: &'static str, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self {
            operation,
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// The foreign-key catalog query failed; the run continues in fallback mode.
#[derive(Debug, Error)]
#[error("foreign-key discovery failed: {0}")]
pub struct DependencyQueryError(#[from] pub CatalogError);

/// What kind of name failed the safe-identifier check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Column,
    Constraint,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Constraint => "constraint",
        })
    }
}

/// Fatal errors that abort a backup run.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("unsafe {kind} identifier {name:?}: only letters, digits and underscores are allowed and it must not start with a digit")]
    UnsafeIdentifier { kind: IdentifierKind, name: String },

    #[error("invalid table pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("could not determine a schema to export for {dialect}; configure one explicitly")]
    SchemaUnresolved { dialect: Dialect },

    #[error("row for table {table} has {actual} values, expected {expected}")]
    RowShape {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("failed to write backup script: {0}")]
    Io(#[from] std::io::Error),
}

/// A [`crate::types::BackupPlan`] failed its closure checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("table {0} appears more than once in the plan")]
    DuplicateTable(String),

    #[error("constraint {constraint} references table {table}, which is not in the plan")]
    DanglingEdge { constraint: String, table: String },

    #[error("circular table {0} is not in the plan")]
    UnknownCircularTable(String),
}
