use super::base_type;
use crate::types::{ColumnDefinition, ColumnKind};

pub(super) const SYSTEM_TABLE_PATTERNS: &[&str] = &[
    "mysql_*",
    "innodb_*",
    "performance_schema*",
    "sys_config",
    "ndb_*",
];

pub(super) const PREAMBLE: &[&str] = &["SET NAMES utf8mb4;"];

const NUMERIC_TYPES: &[&str] = &[
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "integer",
    "bigint",
    "decimal",
    "dec",
    "numeric",
    "fixed",
    "float",
    "double",
    "double precision",
    "real",
    "bool",
    "boolean",
];

const BINARY_TYPES: &[&str] = &[
    "binary",
    "varbinary",
    "tinyblob",
    "blob",
    "mediumblob",
    "longblob",
    "bit",
];

/// MySQL column types carry trailing attributes (`int(10) unsigned zerofill`),
/// so only the first word counts.
fn type_word(data_type: &str) -> String {
    let base = base_type(data_type);
    if base == "double precision" {
        return base;
    }
    base.split_whitespace().next().unwrap_or_default().to_string()
}

pub(super) fn column_kind(data_type: &str) -> ColumnKind {
    let word = type_word(data_type);
    if NUMERIC_TYPES.contains(&word.as_str()) {
        ColumnKind::Numeric
    } else if BINARY_TYPES.contains(&word.as_str()) {
        ColumnKind::Binary
    } else {
        ColumnKind::Text
    }
}

pub(super) fn column_definition(column: &ColumnDefinition) -> String {
    let mut parts: Vec<String> = vec![column.data_type.clone()];
    if !column.nullable {
        parts.push("NOT NULL".into());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {default}"));
    }
    if column.identity.is_some() {
        parts.push("AUTO_INCREMENT".into());
    }
    parts.join(" ")
}

/// Backslash-escaped literal with doubled quotes, as `mysqldump` writes them.
pub(super) fn string_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for c in value.chars() {
        match c {
            '\'' => escaped.push_str("''"),
            '\\' => escaped.push_str("\\\\"),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{1A}' => escaped.push_str("\\Z"),
            c => escaped.push(c),
        }
    }
    escaped.push('\'');
    escaped
}
