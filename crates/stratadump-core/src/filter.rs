//! Table selection by include/exclude wildcards and system-table defaults.
//!
//! Rules are checked in a fixed order and the first one that applies decides:
//! include list, then system tables, then exclude list.

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::BackupError;
use crate::pattern::PatternSet;
use crate::types::{BackupOptions, Dialect, ExcludedTable, ExclusionReason, FilterResult};

/// Compiled filter rules for one run.
#[derive(Debug, Clone)]
pub struct TableFilter {
    include: PatternSet,
    system: Option<PatternSet>,
    exclude: PatternSet,
}

impl TableFilter {
    pub fn new<S: AsRef<str>>(
        dialect: Dialect,
        exclude_system_tables: bool,
        exclude_patterns: &[S],
        include_patterns: &[S],
    ) -> Result<Self, BackupError> {
        let system = if exclude_system_tables {
            Some(PatternSet::compile(dialect.system_table_patterns())?)
        } else {
            None
        };

        Ok(Self {
            include: PatternSet::compile(include_patterns)?,
            system,
            exclude: PatternSet::compile(exclude_patterns)?,
        })
    }

    pub fn from_options(dialect: Dialect, options: &BackupOptions) -> Result<Self, BackupError> {
        Self::new(
            dialect,
            options.exclude_system_tables,
            options.exclude_patterns.as_slice(),
            options.include_patterns.as_slice(),
        )
    }

    /// Why `table` is excluded, or `None` if it is kept.
    pub fn classify(&self, table: &str) -> Option<ExcludedTable> {
        let excluded = |reason, pattern: Option<&str>| ExcludedTable {
            name: table.to_string(),
            reason,
            pattern: pattern.map(str::to_string),
        };

        if !self.include.is_empty() && !self.include.matches(table) {
            return Some(excluded(ExclusionReason::NotIncluded, None));
        }
        if let Some(hit) = self.system.as_ref().and_then(|s| s.first_match(table)) {
            return Some(excluded(ExclusionReason::SystemTable, Some(hit.as_str())));
        }
        if let Some(hit) = self.exclude.first_match(table) {
            return Some(excluded(ExclusionReason::ExcludePattern, Some(hit.as_str())));
        }
        None
    }

    pub fn apply(&self, raw_tables: &[String]) -> FilterResult {
        let mut included = Vec::with_capacity(raw_tables.len());
        let mut excluded = Vec::new();

        for table in raw_tables {
            match self.classify(table) {
                Some(reason) => excluded.push(reason),
                None => included.push(table.clone()),
            }
        }

        #[cfg(feature = "tracing")]
        debug!(
            original = raw_tables.len(),
            included = included.len(),
            excluded = excluded.len(),
            "filtered tables"
        );

        FilterResult::new(raw_tables.len(), included, excluded)
    }
}

/// Filter `raw_tables` in one call.
pub fn filter_tables<S: AsRef<str>>(
    raw_tables: &[String],
    dialect: Dialect,
    exclude_system_tables: bool,
    exclude_patterns: &[S],
    include_patterns: &[S],
) -> Result<FilterResult, BackupError> {
    let filter = TableFilter::new(
        dialect,
        exclude_system_tables,
        exclude_patterns,
        include_patterns,
    )?;
    Ok(filter.apply(raw_tables))
}
