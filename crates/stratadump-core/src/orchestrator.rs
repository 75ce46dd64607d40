//! One backup run, end to end.

use std::io::Write;

use chrono::Utc;
#[cfg(feature = "tracing")]
use tracing::{info, info_span, warn};

use crate::catalog::BackupSource;
use crate::dependency;
use crate::error::BackupError;
use crate::filter::TableFilter;
use crate::generator::{self, ScriptContext};
use crate::schema_resolver::{self, SchemaHint};
use crate::types::{issue_codes, BackupOptions, BackupReport, GenerationMode, Issue, Stage};

/// Resolve the schema, select tables, order them and write the script.
///
/// Only fatal conditions are returned as errors: catalog failures before the
/// tables are listed, an unresolvable schema, unsafe identifiers, unreadable
/// table definitions or rows, and sink failures. A failed foreign-key query
/// produces a fallback script and a recorded issue instead.
pub fn run_backup<C, W>(
    connection: &mut C,
    options: &BackupOptions,
    sink: &mut W,
) -> Result<BackupReport, BackupError>
where
    C: BackupSource + ?Sized,
    W: Write + ?Sized,
{
    let started_at = Utc::now();
    let dialect = connection.dialect();

    #[cfg(feature = "tracing")]
    let _span = info_span!("run_backup", %dialect).entered();

    let mut issues = Vec::new();

    let hint = options.configured_schema.as_deref();
    if let SchemaHint::Rejected(rejected) = SchemaHint::parse(hint) {
        issues.push(Issue::warning(
            Stage::SchemaResolution,
            issue_codes::SCHEMA_HINT_REJECTED,
            format!("configured schema {rejected:?} is not a plain identifier and was ignored"),
        ));
    }

    let schema = schema_resolver::resolve(connection, hint, dialect)?;
    if !schema.is_resolved() {
        return Err(BackupError::SchemaUnresolved { dialect });
    }
    if !schema.exists {
        #[cfg(feature = "tracing")]
        warn!(schema = %schema.resolved_schema, "schema not found in catalog");
        issues.push(Issue::warning(
            Stage::SchemaResolution,
            issue_codes::SCHEMA_NOT_FOUND,
            format!(
                "schema {} was not found in the catalog; continuing",
                schema.resolved_schema
            ),
        ));
    }

    let filter = TableFilter::from_options(dialect, options)?;
    let raw_tables = connection.list_tables(&schema.resolved_schema)?;
    let filtered = filter.apply(&raw_tables);

    let ctx = ScriptContext::new(dialect, schema.resolved_schema.clone())
        .with_generated_at(started_at);

    let (plan, mode, stats) = if filtered.included.is_empty() {
        issues.push(Issue::info(
            Stage::TableFilter,
            issue_codes::EMPTY_TABLE_SET,
            format!(
                "no tables selected out of {} in {}",
                filtered.original_count, schema.resolved_schema
            ),
        ));
        let stats = generator::generate_empty(&ctx, sink)?;
        (None, GenerationMode::Empty, stats)
    } else {
        match dependency::analyze(connection, &filtered.included, &schema.resolved_schema) {
            Ok(plan) => {
                if plan.has_circular_references() {
                    issues.push(Issue::warning(
                        Stage::DependencyAnalysis,
                        issue_codes::CIRCULAR_REFERENCES,
                        format!(
                            "circular foreign-key references among: {}",
                            plan.circular_reference_tables().join(", ")
                        ),
                    ));
                }
                let stats =
                    generator::generate_phased(connection, &ctx, &plan, sink, &mut issues)?;
                (Some(plan), GenerationMode::Phased, stats)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(error = %err, "dependency analysis failed, writing fallback script");
                issues.push(
                    Issue::warning(
                        Stage::DependencyAnalysis,
                        issue_codes::DEPENDENCY_ANALYSIS_FAILED,
                        "dependency ordering was not applied; tables are exported in catalog order",
                    )
                    .with_cause(&err),
                );
                let stats = generator::generate_fallback(
                    connection,
                    &ctx,
                    &filtered.included,
                    &err.to_string(),
                    sink,
                    &mut issues,
                )?;
                (None, GenerationMode::Fallback, stats)
            }
        }
    };

    #[cfg(feature = "tracing")]
    info!(
        ?mode,
        tables = stats.tables,
        rows = stats.rows,
        constraints = stats.constraints,
        "backup script written"
    );

    Ok(BackupReport {
        dialect,
        schema,
        filter: filtered,
        plan,
        mode,
        stats,
        issues,
        started_at,
        finished_at: Utc::now(),
    })
}
