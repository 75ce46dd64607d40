use std::sync::OnceLock;

use regex::Regex;

use super::base_type;
use crate::error::{BackupError, IdentifierKind};
use crate::types::{ColumnDefinition, ColumnKind, Dialect, IdentityKind, TableDefinition};

pub(super) const SYSTEM_TABLE_PATTERNS: &[&str] = &[
    "pg_*",
    "sql_features",
    "sql_implementation_info",
    "sql_parts",
    "sql_sizing",
    "information_schema*",
];

pub(super) const PREAMBLE: &[&str] = &[
    "SET client_encoding = 'UTF8';",
    "SET standard_conforming_strings = 'on';",
];

const NUMERIC_TYPES: &[&str] = &[
    "smallint",
    "integer",
    "int",
    "int2",
    "int4",
    "int8",
    "bigint",
    "numeric",
    "decimal",
    "real",
    "float4",
    "float8",
    "double precision",
    "smallserial",
    "serial",
    "bigserial",
];

pub(super) fn column_kind(data_type: &str) -> ColumnKind {
    if data_type.trim_end().ends_with("[]") {
        return ColumnKind::Text;
    }
    let base = base_type(data_type);
    match base.as_str() {
        "boolean" | "bool" => ColumnKind::Boolean,
        "bytea" => ColumnKind::Binary,
        other if NUMERIC_TYPES.contains(&other) => ColumnKind::Numeric,
        _ => ColumnKind::Text,
    }
}

/// `integer` fed by `nextval(...)` is restored as `SERIAL`, which recreates
/// and owns the sequence.
fn serial_type(column: &ColumnDefinition) -> Option<&'static str> {
    if column.identity.is_some() || !column.is_sequence_backed() {
        return None;
    }
    match base_type(&column.data_type).as_str() {
        "smallint" | "int2" => Some("SMALLSERIAL"),
        "integer" | "int" | "int4" => Some("SERIAL"),
        "bigint" | "int8" => Some("BIGSERIAL"),
        _ => None,
    }
}

fn nextval_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)^\s*nextval\('([A-Za-z0-9_$."]+)'(?:::regclass)?\)\s*$"#)
            .expect("Invalid regex pattern")
    })
}

/// Sequence behind a `nextval` default that `SERIAL` cannot recreate, e.g.
/// on a `numeric` column. The name is returned as written in the default.
fn standalone_sequence(column: &ColumnDefinition) -> Option<&str> {
    if column.identity.is_some() || serial_type(column).is_some() {
        return None;
    }
    let default = column.default.as_deref()?;
    nextval_regex()
        .captures(default)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `CREATE SEQUENCE` statements the built `CREATE TABLE` depends on.
pub(super) fn standalone_sequences(table: &TableDefinition) -> Vec<String> {
    let mut names: Vec<&str> = Vec::new();
    for name in table.columns.iter().filter_map(standalone_sequence) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
        .into_iter()
        .map(|name| format!("CREATE SEQUENCE IF NOT EXISTS {name};"))
        .collect()
}

pub(super) fn column_definition(column: &ColumnDefinition) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    match serial_type(column) {
        Some(serial) => parts.push(serial.to_string()),
        None => {
            parts.push(column.data_type.clone());
            match column.identity {
                Some(IdentityKind::Always) => parts.push("GENERATED ALWAYS AS IDENTITY".into()),
                Some(IdentityKind::ByDefault) => {
                    parts.push("GENERATED BY DEFAULT AS IDENTITY".into())
                }
                None => {
                    if let Some(default) = &column.default {
                        parts.push(format!("DEFAULT {default}"));
                    }
                }
            }
        }
    }

    if !column.nullable {
        parts.push("NOT NULL".into());
    }
    parts.join(" ")
}

pub(super) fn sequence_resets(
    dialect: &Dialect,
    table: &TableDefinition,
) -> Result<Vec<String>, BackupError> {
    let quoted_table = dialect.quote_identifier(&table.name, IdentifierKind::Table)?;
    table
        .columns
        .iter()
        .filter(|c| c.is_sequence_backed())
        .map(|column| {
            let quoted_column = dialect.quote_identifier(&column.name, IdentifierKind::Column)?;
            // Unowned sequences are invisible to pg_get_serial_sequence.
            let sequence = match standalone_sequence(column) {
                Some(name) => format!("'{name}'"),
                None => format!(
                    "pg_get_serial_sequence('{quoted_table}', '{name}')",
                    name = column.name
                ),
            };
            Ok(format!(
                "SELECT setval({sequence}, COALESCE(MAX({quoted_column}), 1)::bigint, MAX({quoted_column}) IS NOT NULL) FROM {quoted_table};",
            ))
        })
        .collect()
}

/// Quote-doubled literal, switching to `E''` syntax when backslashes or
/// control characters must be escaped.
pub(super) fn string_literal(value: &str) -> String {
    let needs_escape = value.chars().any(|c| c == '\\' || c.is_control());
    if !needs_escape {
        return format!("'{}'", value.replace('\'', "''"));
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    escaped.push_str("E'");
    for c in value.chars() {
        match c {
            '\'' => escaped.push_str("''"),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{0C}' => escaped.push_str("\\f"),
            // \x is a raw byte, so only ASCII controls may use it.
            c if c.is_control() && (c as u32) < 0x80 => {
                escaped.push_str(&format!("\\x{:02X}", c as u32));
            }
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped.push('\'');
    escaped
}
