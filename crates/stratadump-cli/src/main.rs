//! stratadump - dependency-ordered SQL backups for PostgreSQL and MySQL

use stratadump_cli::catalog::SqlxCatalog;
use stratadump_cli::cli;
use stratadump_cli::config::{url_has_password, ConfigError, FileConfig, OutputTarget, Settings};
use stratadump_cli::naming::{backup_file_name, partial_path};
use stratadump_cli::output::{format_json, format_table, report_schema_json};
use stratadump_cli::verify::verify_script;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use is_terminal::IsTerminal;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use stratadump_core::{
    issue_codes, run_backup, BackupOptions, BackupReport, Issue, Severity, Stage,
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use cli::{Args, ReportFormat};

/// Connection, catalog or I/O failure.
const EXIT_FAILURE: u8 = 1;
/// `--strict` was given and the run recorded warnings.
const EXIT_STRICT_WARNINGS: u8 = 2;
/// Configuration error (missing URL, unsupported scheme, bad config file).
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();

    if args.report_schema {
        return match report_schema_json() {
            Ok(schema) => match write_output(&None, &schema) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("stratadump: error: {e:#}");
                    ExitCode::from(EXIT_FAILURE)
                }
            },
            Err(e) => {
                eprintln!("stratadump: error: {e:#}");
                ExitCode::from(EXIT_FAILURE)
            }
        };
    }

    init_tracing(args.verbose, args.quiet);

    match run(args) {
        Ok(strict_failure) => {
            if strict_failure {
                ExitCode::from(EXIT_STRICT_WARNINGS)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("stratadump: error: {e:#}");
            if e.downcast_ref::<ConfigError>().is_some() {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init only happens in tests; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Run one backup. Returns true when `--strict` turns recorded warnings into a failure.
fn run(args: Args) -> Result<bool> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, file_config)?;

    // Warn if credentials appear to be embedded in the URL
    if url_has_password(&settings.url) && !settings.quiet {
        eprintln!(
            "stratadump: warning: Database credentials in --url may be logged in shell history. \
             Consider using the DATABASE_URL environment variable or a config file instead."
        );
    }

    let mut catalog =
        SqlxCatalog::connect(&settings.url).context("Failed to connect to database")?;

    let started_at = Utc::now();
    let (mut report, script_path) = match &settings.output {
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            let mut sink = BufWriter::new(stdout.lock());
            let report = run_backup(&mut catalog, &settings.options, &mut sink)?;
            sink.flush().context("Failed to write to stdout")?;
            (report, None)
        }
        OutputTarget::File(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let (report, path) =
                write_script_file(&mut catalog, &settings.options, &dir, started_at, |_| {
                    path.clone()
                })?;
            (report, Some(path))
        }
        OutputTarget::Directory(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
            let (report, path) =
                write_script_file(&mut catalog, &settings.options, dir, started_at, |report| {
                    dir.join(backup_file_name(&report.schema.resolved_schema, started_at))
                })?;
            (report, Some(path))
        }
    };

    if let Err(e) = catalog.close() {
        warn!(error = %e, "failed to close the database connection");
    }

    if settings.verify {
        match &script_path {
            Some(path) => verify_written_script(&mut report, path),
            None if !settings.quiet => {
                eprintln!("stratadump: warning: --verify is ignored when the script goes to stdout");
            }
            None => {}
        }
    }

    emit_report(&settings, &report, script_path.as_deref())?;

    Ok(settings.strict && report.has_warnings())
}

/// Stream the script into a hidden partial file in `dir`, then rename it.
///
/// The partial file is removed when the run fails, so a half-written script
/// never carries a final name.
fn write_script_file(
    catalog: &mut SqlxCatalog,
    options: &BackupOptions,
    dir: &Path,
    started_at: DateTime<Utc>,
    final_path: impl FnOnce(&BackupReport) -> PathBuf,
) -> Result<(BackupReport, PathBuf)> {
    let partial = partial_path(dir, started_at);
    let file = File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    let mut sink = BufWriter::new(file);

    let written = run_backup(catalog, options, &mut sink)
        .map_err(anyhow::Error::from)
        .and_then(|report| {
            sink.flush()
                .with_context(|| format!("Failed to write to {}", partial.display()))?;
            Ok(report)
        });
    drop(sink);

    let report = match written {
        Ok(report) => report,
        Err(e) => {
            discard_partial(&partial);
            return Err(e);
        }
    };

    let target = final_path(&report);
    if let Err(e) = fs::rename(&partial, &target) {
        discard_partial(&partial);
        return Err(e).with_context(|| format!("Failed to write to {}", target.display()));
    }
    debug!(path = %target.display(), "script written");

    Ok((report, target))
}

fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove partial script");
    }
}

fn verify_written_script(report: &mut BackupReport, path: &Path) {
    match verify_script(path, report.dialect) {
        Ok(statements) => debug!(statements, "script parsed"),
        Err(e) => report.issues.push(
            Issue::warning(
                Stage::ScriptGeneration,
                issue_codes::SCRIPT_VERIFY_FAILED,
                format!("{} does not parse as {} SQL", path.display(), report.dialect),
            )
            .with_cause(format!("{e:#}")),
        ),
    }
}

/// Write the report where it belongs and echo issues to stderr.
///
/// The report goes to `--report-file` when given. Otherwise it goes to stdout,
/// or to stderr when stdout already carries the script.
fn emit_report(settings: &Settings, report: &BackupReport, script_path: Option<&Path>) -> Result<()> {
    let script_on_stdout = settings.output == OutputTarget::Stdout;
    let location = script_path.map(|p| p.display().to_string());

    let render = |colored: bool| -> Result<String> {
        Ok(match settings.report_format {
            ReportFormat::Json => format_json(report, settings.compact)?,
            ReportFormat::Table => format_table(report, location.as_deref(), colored),
        })
    };

    if let Some(path) = &settings.report_file {
        write_output(&Some(path.clone()), &render(false)?)?;
    } else if !settings.quiet {
        if script_on_stdout {
            let content = render(io::stderr().is_terminal())?;
            io::stderr()
                .write_all(content.as_bytes())
                .context("Failed to write to stderr")?;
            // The table lists the issues already.
            return Ok(());
        }
        write_output(&None, &render(io::stdout().is_terminal())?)?;
    }

    if !settings.quiet {
        print_issues_to_stderr(report);
    }
    Ok(())
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = path {
        fs::write(path, content)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    } else {
        io::stdout()
            .write_all(content.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure newline at end for terminal output
        if !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn print_issues_to_stderr(report: &BackupReport) {
    for issue in &report.issues {
        let level = match issue.severity {
            Severity::Warning => "warning",
            Severity::Info => "info",
        };

        match &issue.cause {
            Some(cause) => eprintln!("stratadump: {level}: {} ({cause})", issue.message),
            None => eprintln!("stratadump: {level}: {}", issue.message),
        }
    }
}
