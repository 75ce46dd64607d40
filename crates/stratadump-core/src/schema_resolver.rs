//! Determines the schema (PostgreSQL) or database (MySQL) a run exports.

#[cfg(feature = "tracing")]
use tracing::{debug, info_span};

use crate::catalog::CatalogReader;
use crate::error::CatalogError;
use crate::identifier::is_safe_identifier;
use crate::types::{Dialect, ResolutionMethod, SchemaResolution};

/// Schema used when PostgreSQL reports nothing and no hint is configured.
pub const DEFAULT_POSTGRES_SCHEMA: &str = "public";

/// What a configured schema hint amounts to after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaHint<'a> {
    Absent,
    Usable(&'a str),
    /// Present but not a safe identifier; ignored.
    Rejected(&'a str),
}

impl<'a> SchemaHint<'a> {
    pub fn parse(raw: Option<&'a str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Absent,
            Some(hint) if is_safe_identifier(hint) => Self::Usable(hint),
            Some(hint) => Self::Rejected(hint),
        }
    }

    fn usable(self) -> Option<&'a str> {
        match self {
            Self::Usable(hint) => Some(hint),
            _ => None,
        }
    }

    fn configured(self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Usable(hint) | Self::Rejected(hint) => Some(hint.to_string()),
        }
    }
}

/// First concrete entry of a PostgreSQL search path, skipping `$user`-style
/// placeholders.
pub fn first_search_path_entry(search_path: &str) -> Option<String> {
    search_path
        .split(',')
        .map(|entry| entry.trim().trim_matches('"').trim())
        .find(|entry| !entry.is_empty() && !entry.starts_with('$'))
        .map(str::to_string)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the effective schema and check that it exists.
///
/// A missing schema is reported through `exists = false`, not as an error.
/// Errors are connectivity failures of the catalog lookups themselves.
pub fn resolve<C: CatalogReader + ?Sized>(
    catalog: &mut C,
    configured_hint: Option<&str>,
    dialect: Dialect,
) -> Result<SchemaResolution, CatalogError> {
    #[cfg(feature = "tracing")]
    let _span = info_span!("resolve_schema", %dialect).entered();

    let hint = SchemaHint::parse(configured_hint);
    let configured = hint.configured();

    let chosen = match dialect {
        Dialect::Mysql => {
            if let Some(database) = non_empty(catalog.current_schema()?) {
                Some((database, ResolutionMethod::ConnectionDefault))
            } else {
                hint.usable()
                    .map(|h| (h.to_string(), ResolutionMethod::Configured))
            }
        }
        Dialect::Postgres => {
            let chosen = if let Some(schema) = non_empty(catalog.current_schema()?) {
                (schema, ResolutionMethod::ConnectionDefault)
            } else if let Some(schema) = catalog
                .search_path()?
                .as_deref()
                .and_then(first_search_path_entry)
            {
                (schema, ResolutionMethod::SearchPath)
            } else if let Some(h) = hint.usable() {
                (h.to_string(), ResolutionMethod::Configured)
            } else {
                (
                    DEFAULT_POSTGRES_SCHEMA.to_string(),
                    ResolutionMethod::BuiltInDefault,
                )
            };
            Some(chosen)
        }
    };

    let Some((schema, method)) = chosen else {
        #[cfg(feature = "tracing")]
        debug!("no schema could be resolved");
        return Ok(SchemaResolution::new(
            String::new(),
            configured,
            false,
            ResolutionMethod::Unresolved,
        ));
    };

    let exists = catalog.schema_exists(&schema)?;

    #[cfg(feature = "tracing")]
    debug!(schema = %schema, ?method, exists, "schema resolved");

    Ok(SchemaResolution::new(schema, configured, exists, method))
}
