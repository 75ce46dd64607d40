//! Seams between the pipeline and a live database.
//!
//! The pipeline never opens connections or issues SQL itself; it talks to a
//! [`CatalogReader`] for metadata and a [`TableSource`] for table definitions and
//! rows. Adapters own the connection and surface failures as [`CatalogError`].

use crate::error::{BackupError, CatalogError};
use crate::types::{CellValue, Dialect, ForeignKeyEdge, TableDefinition};

/// Callback receiving one row at a time. The slice is only valid for the call.
pub type RowVisitor<'a> = dyn FnMut(&[CellValue]) -> Result<(), BackupError> + 'a;

/// Read-only catalog queries used for schema resolution, table discovery and
/// dependency analysis.
pub trait CatalogReader {
    fn dialect(&self) -> Dialect;

    /// The connection's current schema (PostgreSQL) or database (MySQL), if any.
    fn current_schema(&mut self) -> Result<Option<String>, CatalogError>;

    /// Raw search path setting, e.g. `"$user", public`. Only PostgreSQL has one.
    fn search_path(&mut self) -> Result<Option<String>, CatalogError> {
        Ok(None)
    }

    fn schema_exists(&mut self, schema: &str) -> Result<bool, CatalogError>;

    /// Base tables of `schema`, in catalog order.
    fn list_tables(&mut self, schema: &str) -> Result<Vec<String>, CatalogError>;

    /// Foreign keys declared in `schema` that involve `tables`. Implementations
    /// may return extra rows; the analyzer restricts them to the table set.
    fn list_foreign_keys(
        &mut self,
        schema: &str,
        tables: &[String],
    ) -> Result<Vec<ForeignKeyEdge>, CatalogError>;
}

/// Table definitions and row streams for script generation.
pub trait TableSource {
    fn describe_table(&mut self, schema: &str, table: &str)
        -> Result<TableDefinition, CatalogError>;

    /// Stream every row of `table` into `visitor`, one row at a time, with one
    /// value per column of `table.columns`. Errors returned by the visitor must
    /// be propagated unchanged.
    fn for_each_row(
        &mut self,
        schema: &str,
        table: &TableDefinition,
        visitor: &mut RowVisitor<'_>,
    ) -> Result<(), BackupError>;
}

/// A connection able to serve a whole backup run.
pub trait BackupSource: CatalogReader + TableSource {}

impl<T: CatalogReader + TableSource + ?Sized> BackupSource for T {}
