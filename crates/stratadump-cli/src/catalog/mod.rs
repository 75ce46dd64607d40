//! Live database catalog access.
//!
//! [`SqlxCatalog`] implements the core `CatalogReader` and `TableSource` traits
//! over a single sqlx `AnyConnection`, so one connection serves schema
//! resolution, discovery, dependency analysis and row streaming.

mod queries;
mod sqlx_catalog;

pub use sqlx_catalog::SqlxCatalog;
