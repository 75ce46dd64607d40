//! Types shared across pipeline stages.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pipeline stage an issue was raised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SchemaResolution,
    TableFilter,
    DependencyAnalysis,
    ScriptGeneration,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaResolution => "schema_resolution",
            Self::TableFilter => "table_filter",
            Self::DependencyAnalysis => "dependency_analysis",
            Self::ScriptGeneration => "script_generation",
        }
    }
}

/// A non-fatal condition recorded during a backup run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Severity level
    pub severity: Severity,

    /// Machine-readable issue code
    pub code: String,

    /// Stage the issue is addressed to
    pub destination: Stage,

    /// Human-readable message
    pub message: String,

    /// Underlying error text, when the issue wraps a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,

    /// When the issue was recorded
    pub timestamp: DateTime<Utc>,
}

impl Issue {
    pub fn warning(destination: Stage, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, destination, code, message)
    }

    pub fn info(destination: Stage, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, destination, code, message)
    }

    fn new(
        severity: Severity,
        destination: Stage,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            destination,
            message: message.into(),
            cause: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// Machine-readable issue codes.
pub mod issue_codes {
    pub const SCHEMA_NOT_FOUND: &str = "SCHEMA_NOT_FOUND";
    pub const SCHEMA_HINT_REJECTED: &str = "SCHEMA_HINT_REJECTED";
    pub const EMPTY_TABLE_SET: &str = "EMPTY_TABLE_SET";
    pub const DEPENDENCY_ANALYSIS_FAILED: &str = "DEPENDENCY_ANALYSIS_FAILED";
    pub const CIRCULAR_REFERENCES: &str = "CIRCULAR_REFERENCES";
    pub const FOREIGN_KEYS_UNAVAILABLE: &str = "FOREIGN_KEYS_UNAVAILABLE";
    pub const SCRIPT_VERIFY_FAILED: &str = "SCRIPT_VERIFY_FAILED";
}
