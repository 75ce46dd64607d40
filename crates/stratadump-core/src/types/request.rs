//! Input types for a backup run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SQL dialect of the database being exported.
///
/// The dialect decides how the effective schema is probed, which catalog tables are
/// filtered by default, and how DDL, literals and identifiers are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL: explicit current schema plus a search path.
    Postgres,
    /// MySQL / MariaDB: the database is the unit of isolation.
    Mysql,
}

impl Dialect {
    /// Infer the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Some(Self::Mysql)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    /// The sqlparser dialect matching this engine, used to validate rendered SQL.
    pub fn to_sqlparser_dialect(&self) -> Box<dyn sqlparser::dialect::Dialect> {
        use sqlparser::dialect::{MySqlDialect, PostgreSqlDialect};
        match self {
            Self::Postgres => Box::new(PostgreSqlDialect {}),
            Self::Mysql => Box::new(MySqlDialect {}),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::Mysql),
            other => Err(format!("unsupported dialect '{other}'")),
        }
    }
}

/// Settings for one backup run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupOptions {
    /// Schema (PostgreSQL) or database (MySQL) to fall back on when the
    /// connection does not report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configured_schema: Option<String>,

    /// Skip catalog, spatial-extension and migration-tool tables.
    #[serde(default = "default_true")]
    pub exclude_system_tables: bool,

    /// When non-empty, only tables matching one of these wildcards are exported.
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Tables matching any of these wildcards are skipped.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            configured_schema: None,
            exclude_system_tables: true,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl BackupOptions {
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.configured_schema = Some(schema.into());
        self
    }

    pub fn with_include(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_tables(mut self) -> Self {
        self.exclude_system_tables = false;
        self
    }
}
