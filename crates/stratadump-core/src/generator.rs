//! Script generation.
//!
//! A phased script has three parts so that it restores without tripping a
//! foreign key at any point:
//!
//! 1. `DROP` and `CREATE` every table, foreign keys left out.
//! 2. Insert the data, parents before children.
//! 3. Add the foreign keys (and, on PostgreSQL, move sequences past the data).
//!
//! When dependency analysis failed, a fallback script drops every table up
//! front and then emits one create/data block per table in catalog order.
//!
//! Scripts are written to the sink as they are produced; rows are streamed
//! one at a time and never collected.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
#[cfg(feature = "tracing")]
use tracing::{debug, info_span};

use crate::catalog::TableSource;
use crate::dialect::ForeignKeys;
use crate::error::BackupError;
use crate::identifier::comment_text;
use crate::types::{
    issue_codes, BackupPlan, CellValue, Dialect, ForeignKeyConstraint, ForeignKeyEdge,
    GenerationMode, GenerationStats, Issue, Stage, TableDefinition,
};

/// Facts stamped into the script header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContext {
    pub dialect: Dialect,
    pub schema: String,
    pub generated_at: DateTime<Utc>,
}

impl ScriptContext {
    pub fn new(dialect: Dialect, schema: impl Into<String>) -> Self {
        Self {
            dialect,
            schema: schema.into(),
            generated_at: Utc::now(),
        }
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }
}

fn mode_label(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Phased => "phased (structures, data, constraints)",
        GenerationMode::Fallback => "fallback (catalog order, no dependency ordering)",
        GenerationMode::Empty => "empty",
    }
}

fn write_header<W: Write + ?Sized>(
    sink: &mut W,
    ctx: &ScriptContext,
    mode: GenerationMode,
) -> Result<(), BackupError> {
    writeln!(sink, "-- stratadump backup")?;
    writeln!(sink, "-- Dialect: {}", ctx.dialect)?;
    writeln!(sink, "-- Schema: {}", comment_text(&ctx.schema))?;
    writeln!(
        sink,
        "-- Generated at: {}",
        ctx.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )?;
    writeln!(sink, "-- Mode: {}", mode_label(mode))?;
    writeln!(sink)?;
    for statement in ctx.dialect.preamble() {
        writeln!(sink, "{statement}")?;
    }
    writeln!(sink)?;
    Ok(())
}

fn write_structure<W: Write + ?Sized>(
    sink: &mut W,
    dialect: Dialect,
    definition: &TableDefinition,
    foreign_keys: ForeignKeys,
) -> Result<(), BackupError> {
    let create = dialect.render_create_table(definition, foreign_keys)?;
    writeln!(sink, "-- Table: {}", definition.name)?;
    if foreign_keys == ForeignKeys::Omit {
        writeln!(sink, "{}", dialect.render_drop_table(&definition.name)?)?;
    }
    writeln!(sink, "{create}")?;
    writeln!(sink)?;
    Ok(())
}

/// Tables described without their foreign keys, with the first cause seen.
#[derive(Debug, Default)]
struct MissingForeignKeys {
    tables: Vec<String>,
    cause: Option<String>,
}

impl MissingForeignKeys {
    fn note(&mut self, definition: &TableDefinition) {
        if let Some(cause) = &definition.foreign_keys_unavailable {
            #[cfg(feature = "tracing")]
            debug!(table = %definition.name, %cause, "foreign keys unavailable");
            self.tables.push(definition.name.clone());
            self.cause.get_or_insert_with(|| cause.clone());
        }
    }

    fn report(self, issues: &mut Vec<Issue>, consequence: &str) {
        let Some(cause) = self.cause else {
            return;
        };
        issues.push(
            Issue::warning(
                Stage::ScriptGeneration,
                issue_codes::FOREIGN_KEYS_UNAVAILABLE,
                format!(
                    "foreign keys could not be read for: {}; {consequence}",
                    self.tables.join(", ")
                ),
            )
            .with_cause(cause),
        );
    }
}

/// Stream every row of `definition` into `sink`. Returns the row count.
fn write_rows<S, W>(
    source: &mut S,
    sink: &mut W,
    ctx: &ScriptContext,
    definition: &TableDefinition,
) -> Result<u64, BackupError>
where
    S: TableSource + ?Sized,
    W: Write + ?Sized,
{
    if definition.columns.is_empty() {
        return Ok(0);
    }

    let template = ctx.dialect.insert_template(definition)?;
    writeln!(sink, "-- Data: {}", definition.name)?;

    let mut rows = 0u64;
    let mut emit = |row: &[CellValue]| -> Result<(), BackupError> {
        let statement = template.render(row)?;
        writeln!(sink, "{statement}")?;
        rows += 1;
        Ok(())
    };
    source.for_each_row(&ctx.schema, definition, &mut emit)?;
    writeln!(sink)?;

    #[cfg(feature = "tracing")]
    debug!(table = %definition.name, rows, "table data written");

    Ok(rows)
}

fn write_sequence_resets<W: Write + ?Sized>(
    sink: &mut W,
    dialect: Dialect,
    definition: &TableDefinition,
) -> Result<(), BackupError> {
    for statement in dialect.sequence_resets(definition)? {
        writeln!(sink, "{statement}")?;
    }
    Ok(())
}

/// Write a phased script for `plan`.
///
/// Tables whose foreign keys could not be described are still exported;
/// each one adds a warning to `issues`.
pub fn generate_phased<S, W>(
    source: &mut S,
    ctx: &ScriptContext,
    plan: &BackupPlan,
    sink: &mut W,
    issues: &mut Vec<Issue>,
) -> Result<GenerationStats, BackupError>
where
    S: TableSource + ?Sized,
    W: Write + ?Sized,
{
    #[cfg(feature = "tracing")]
    let _span = info_span!("generate_phased", tables = plan.tables().len()).entered();

    let dialect = ctx.dialect;
    let mut stats = GenerationStats::default();

    write_header(sink, ctx, GenerationMode::Phased)?;
    if plan.has_circular_references() {
        writeln!(
            sink,
            "-- WARNING: circular foreign-key references among: {}",
            plan.circular_reference_tables().join(", ")
        )?;
        writeln!(
            sink,
            "-- These tables are loaded after all others; their foreign keys are added in phase 3."
        )?;
        writeln!(sink)?;
    }

    writeln!(sink, "-- Phase 1: table structures without foreign keys")?;
    writeln!(sink)?;
    let mut definitions = Vec::with_capacity(plan.tables().len());
    let mut missing = MissingForeignKeys::default();
    for table in plan.tables() {
        let definition = source.describe_table(plan.schema(), table)?;
        missing.note(&definition);
        write_structure(sink, dialect, &definition, ForeignKeys::Omit)?;
        stats.tables += 1;
        definitions.push(definition);
    }

    writeln!(sink, "-- Phase 2: data in dependency order")?;
    writeln!(sink)?;
    for definition in &definitions {
        stats.rows += write_rows(source, sink, ctx, definition)?;
    }

    writeln!(sink, "-- Phase 3: foreign-key constraints")?;
    writeln!(sink)?;
    // Self-references never enter the plan's edges but still need restoring.
    let mut edges: Vec<ForeignKeyEdge> = plan.edges().to_vec();
    for definition in &definitions {
        edges.extend(
            definition
                .foreign_keys
                .iter()
                .filter(|edge| edge.is_self_reference())
                .cloned(),
        );
    }
    for constraint in ForeignKeyConstraint::group(&edges) {
        writeln!(sink, "{}", dialect.render_add_constraint(&constraint)?)?;
        stats.constraints += 1;
    }
    for definition in &definitions {
        write_sequence_resets(sink, dialect, definition)?;
    }
    missing.report(issues, "self-referencing constraints of these tables are not restored");

    writeln!(sink)?;
    writeln!(sink, "-- End of backup")?;
    sink.flush()?;
    Ok(stats)
}

/// Write a fallback script: every table dropped first, then one create/data
/// block per table in the given order with foreign keys declared inline.
pub fn generate_fallback<S, W>(
    source: &mut S,
    ctx: &ScriptContext,
    tables: &[String],
    reason: &str,
    sink: &mut W,
    issues: &mut Vec<Issue>,
) -> Result<GenerationStats, BackupError>
where
    S: TableSource + ?Sized,
    W: Write + ?Sized,
{
    #[cfg(feature = "tracing")]
    let _span = info_span!("generate_fallback", tables = tables.len()).entered();

    let dialect = ctx.dialect;
    let mut stats = GenerationStats::default();

    write_header(sink, ctx, GenerationMode::Fallback)?;
    writeln!(
        sink,
        "-- WARNING: dependency ordering was not applied ({}).",
        comment_text(reason)
    )?;
    writeln!(
        sink,
        "-- Tables follow catalog order, each with its foreign keys declared inline."
    )?;
    writeln!(
        sink,
        "-- Restoring may violate foreign-key constraints unless constraint checks are relaxed."
    )?;
    for line in fallback_advice(dialect) {
        writeln!(sink, "-- {line}")?;
    }
    writeln!(sink)?;

    // All drops precede the first CREATE so a cascading drop never removes a
    // constraint this script has already declared.
    writeln!(sink, "-- Drop existing tables")?;
    for table in tables {
        writeln!(sink, "{}", dialect.render_drop_table(table)?)?;
    }
    writeln!(sink)?;

    let mut missing = MissingForeignKeys::default();
    for table in tables {
        let definition = source.describe_table(&ctx.schema, table)?;
        if definition.loses_inline_foreign_keys() {
            missing.note(&definition);
        }
        write_structure(sink, dialect, &definition, ForeignKeys::Inline)?;
        stats.rows += write_rows(source, sink, ctx, &definition)?;
        write_sequence_resets(sink, dialect, &definition)?;
        writeln!(sink)?;
        stats.tables += 1;
    }
    missing.report(issues, "these tables are created without foreign keys");

    writeln!(sink, "-- End of backup")?;
    sink.flush()?;
    Ok(stats)
}

fn fallback_advice(dialect: Dialect) -> &'static [&'static str] {
    match dialect {
        Dialect::Mysql => &[
            "Run with SET FOREIGN_KEY_CHECKS = 0 so a table may reference one created later",
            "and rows may precede the rows they reference.",
        ],
        Dialect::Postgres => &[
            "PostgreSQL rejects a REFERENCES clause naming a table that does not exist yet:",
            "move such a block below the block of the table it references before restoring.",
            "SET session_replication_role = replica only suspends row checks, not DDL.",
        ],
    }
}

/// Header-only script for a run that selected no tables.
pub fn generate_empty<W: Write + ?Sized>(
    ctx: &ScriptContext,
    sink: &mut W,
) -> Result<GenerationStats, BackupError> {
    write_header(sink, ctx, GenerationMode::Empty)?;
    writeln!(sink, "-- No tables matched the filter rules; nothing to restore.")?;
    sink.flush()?;
    Ok(GenerationStats::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_script_has_header_only() {
        let ctx = ScriptContext::new(Dialect::Postgres, "public")
            .with_generated_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let mut out = Vec::<u8>::new();
        let stats = generate_empty(&ctx, &mut out).expect("generate");
        let script = String::from_utf8(out).expect("utf8");

        assert_eq!(stats, GenerationStats::default());
        assert!(script.starts_with("-- stratadump backup\n-- Dialect: postgres\n-- Schema: public\n-- Generated at: 2024-03-01T12:00:00Z\n"));
        assert!(script.contains("-- No tables matched"));
        assert!(!script.contains("CREATE TABLE"));
    }
}
