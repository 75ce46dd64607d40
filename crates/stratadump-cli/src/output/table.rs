//! Human-readable report formatting.

use owo_colors::OwoColorize;
use std::fmt::Write;
use stratadump_core::{BackupReport, ExclusionReason, GenerationMode, ResolutionMethod, Severity};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Note")]
    note: String,
}

#[derive(Tabled)]
struct ExcludedRow {
    #[tabled(rename = "Table")]
    table: String,
    #[tabled(rename = "Reason")]
    reason: &'static str,
    #[tabled(rename = "Pattern")]
    pattern: String,
}

/// Format the run report as text with optional colors.
///
/// `script_location` names where the script was written, when known.
pub fn format_table(report: &BackupReport, script_location: Option<&str>, colored: bool) -> String {
    let mut out = String::new();

    write_header(&mut out, colored);
    write_summary(&mut out, report, script_location, colored);
    write_order(&mut out, report, colored);
    write_excluded(&mut out, report, colored);
    write_issues(&mut out, report, colored);

    out
}

fn heading(out: &mut String, text: &str, colored: bool) {
    if colored {
        writeln!(out, "{}", text.bold()).unwrap();
    } else {
        writeln!(out, "{text}").unwrap();
    }
}

fn write_header(out: &mut String, colored: bool) {
    let title = "stratadump backup";
    let line = "═".repeat(50);

    if colored {
        writeln!(out, "{}", title.bold()).unwrap();
        writeln!(out, "{}", line.dimmed()).unwrap();
    } else {
        writeln!(out, "{title}").unwrap();
        writeln!(out, "{line}").unwrap();
    }
}

fn method_label(method: ResolutionMethod) -> &'static str {
    match method {
        ResolutionMethod::ConnectionDefault => "connection default",
        ResolutionMethod::SearchPath => "search path",
        ResolutionMethod::Configured => "configured",
        ResolutionMethod::BuiltInDefault => "built-in default",
        ResolutionMethod::Unresolved => "unresolved",
    }
}

fn mode_label(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Phased => "phased (structures, data, constraints)",
        GenerationMode::Fallback => "fallback (catalog order, inline constraints)",
        GenerationMode::Empty => "empty (no tables selected)",
    }
}

fn write_summary(
    out: &mut String,
    report: &BackupReport,
    script_location: Option<&str>,
    colored: bool,
) {
    let schema = &report.schema;
    let missing = if schema.exists { "" } else { ", not found" };
    writeln!(
        out,
        "Schema:  {} ({}, {}{missing})",
        schema.resolved_schema,
        report.dialect,
        method_label(schema.method)
    )
    .unwrap();
    writeln!(out, "Mode:    {}", mode_label(report.mode)).unwrap();
    if let Some(location) = script_location {
        writeln!(out, "Script:  {location}").unwrap();
    }
    writeln!(out).unwrap();

    let elapsed = report.finished_at - report.started_at;
    let stats = format!(
        "Summary: {} of {} tables | {} rows | {} constraints | {:.1}s",
        report.filter.included_count,
        report.filter.original_count,
        report.stats.rows,
        report.stats.constraints,
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    if colored {
        writeln!(out, "{}", stats.cyan()).unwrap();
    } else {
        writeln!(out, "{stats}").unwrap();
    }

    writeln!(out).unwrap();
}

fn write_order(out: &mut String, report: &BackupReport, colored: bool) {
    let (title, tables, circular): (&str, &[String], &[String]) = match &report.plan {
        Some(plan) => (
            "Restore order:",
            plan.tables(),
            plan.circular_reference_tables(),
        ),
        None if report.filter.included.is_empty() => return,
        None => ("Catalog order (unordered):", &report.filter.included, &[]),
    };

    let rows: Vec<OrderRow> = tables
        .iter()
        .enumerate()
        .map(|(i, table)| OrderRow {
            position: i + 1,
            table: table.clone(),
            note: if circular.contains(table) {
                "circular".to_string()
            } else {
                String::new()
            },
        })
        .collect();

    heading(out, title, colored);
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    writeln!(out, "{table}").unwrap();
    writeln!(out).unwrap();
}

fn reason_label(reason: ExclusionReason) -> &'static str {
    match reason {
        ExclusionReason::NotIncluded => "not included",
        ExclusionReason::SystemTable => "system table",
        ExclusionReason::ExcludePattern => "excluded",
    }
}

fn write_excluded(out: &mut String, report: &BackupReport, colored: bool) {
    if report.filter.excluded.is_empty() {
        return;
    }

    let rows: Vec<ExcludedRow> = report
        .filter
        .excluded
        .iter()
        .map(|e| ExcludedRow {
            table: e.name.clone(),
            reason: reason_label(e.reason),
            pattern: e.pattern.clone().unwrap_or_default(),
        })
        .collect();

    heading(
        out,
        &format!("Excluded ({}):", report.filter.excluded_count),
        colored,
    );
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    writeln!(out, "{table}").unwrap();
    writeln!(out).unwrap();
}

fn write_issues(out: &mut String, report: &BackupReport, colored: bool) {
    if report.issues.is_empty() {
        return;
    }

    heading(out, &format!("Issues ({}):", report.issues.len()), colored);

    for issue in &report.issues {
        let severity_str = match issue.severity {
            Severity::Warning => {
                if colored {
                    "WARN".yellow().to_string()
                } else {
                    "WARN".to_string()
                }
            }
            Severity::Info => {
                if colored {
                    "INFO".blue().to_string()
                } else {
                    "INFO".to_string()
                }
            }
        };

        writeln!(
            out,
            "  [{severity_str}] {} ({}): {}",
            issue.code,
            issue.destination.as_str(),
            issue.message
        )
        .unwrap();
        if let Some(cause) = &issue.cause {
            writeln!(out, "         caused by: {cause}").unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn test_format_table_phased() {
        let report = fixtures::report();
        let output = format_table(&report, Some("public-20240309-070501.sql"), false);

        assert!(output.starts_with("stratadump backup\n"));
        assert!(output.contains("Schema:  public (postgres, connection default)"));
        assert!(output.contains("Script:  public-20240309-070501.sql"));
        assert!(output.contains("Summary: 4 of 5 tables | 42 rows | 3 constraints | 3.0s"));
        assert!(output.contains("Restore order:"));
        assert!(output.contains("circular"));
        assert!(output.contains("spatial_ref_sys"));
        assert!(output.contains("[WARN] CIRCULAR_REFERENCES (dependency_analysis): "));

        let users = output.find("│ users").expect("users row");
        let payments = output.find("│ payments").expect("payments row");
        assert!(users < payments);
    }

    #[test]
    fn test_format_table_fallback_lists_catalog_order() {
        let mut report = fixtures::report();
        report.plan = None;
        report.mode = GenerationMode::Fallback;

        let output = format_table(&report, None, false);
        assert!(output.contains("Catalog order (unordered):"));
        assert!(!output.contains("Script:"));
        assert!(!output.contains("│ circular"));
    }

    #[test]
    fn test_format_table_empty_run() {
        let mut report = fixtures::report();
        report.plan = None;
        report.mode = GenerationMode::Empty;
        report.filter.included.clear();
        report.issues.clear();

        let output = format_table(&report, None, false);
        assert!(output.contains("empty (no tables selected)"));
        assert!(!output.contains("order"));
        assert!(!output.contains("Issues"));
    }
}
