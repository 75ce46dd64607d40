//! CLI argument parsing using clap.

use clap::{ArgAction, Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// stratadump - dependency-ordered SQL backups
#[derive(Parser, Debug)]
#[command(name = "stratadump")]
#[command(
    about = "Write a restorable SQL backup of one PostgreSQL schema or MySQL database",
    long_about = None
)]
#[command(version)]
pub struct Args {
    /// Database connection URL
    /// (e.g., postgres://user@host/db, mysql://user@host/db)
    #[arg(long, env = "DATABASE_URL", value_name = "URL", hide_env_values = true)]
    pub url: Option<String>,

    /// Expected SQL dialect; the run fails if the URL scheme disagrees
    #[arg(short, long, value_enum)]
    pub dialect: Option<DialectArg>,

    /// Schema (PostgreSQL) or database (MySQL) to export when the connection
    /// does not report one
    #[arg(short, long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Only export tables matching these wildcards (`*`, `?`; repeatable or comma-separated)
    #[arg(long, value_name = "PATTERN", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip tables matching these wildcards (repeatable or comma-separated)
    #[arg(long, value_name = "PATTERN", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Keep catalog, spatial-extension and migration-tool tables
    #[arg(long)]
    pub no_exclude_system_tables: bool,

    /// Script file, or `-` for stdout (defaults to <schema>-<timestamp>.sql)
    #[arg(short, long, value_name = "FILE", conflicts_with = "output_dir")]
    pub output: Option<PathBuf>,

    /// Directory for the default-named script file
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report format
    #[arg(short = 'f', long, value_enum)]
    pub report_format: Option<ReportFormat>,

    /// Write the run report to this file instead of the terminal
    #[arg(long, value_name = "FILE")]
    pub report_file: Option<PathBuf>,

    /// Compact JSON report (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Parse the written script back with sqlparser and warn on failures
    #[arg(long)]
    pub verify: bool,

    /// Exit with status 2 when the run reported warnings
    #[arg(long)]
    pub strict: bool,

    /// Suppress warnings and the report on the terminal
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// TOML file with default settings; command-line arguments win
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the JSON schema of the run report and exit
    #[arg(long)]
    pub report_schema: bool,
}

/// SQL dialect options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectArg {
    #[value(alias = "postgresql")]
    #[serde(alias = "postgresql")]
    Postgres,
    #[value(alias = "mariadb")]
    #[serde(alias = "mariadb")]
    Mysql,
}

impl From<DialectArg> for stratadump_core::Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Postgres => stratadump_core::Dialect::Postgres,
            DialectArg::Mysql => stratadump_core::Dialect::Mysql,
        }
    }
}

/// Report format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary
    #[default]
    Table,
    /// JSON report
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_conversion() {
        let dialect: stratadump_core::Dialect = DialectArg::Mysql.into();
        assert_eq!(dialect, stratadump_core::Dialect::Mysql);
    }

    #[test]
    fn test_parse_minimal_args() {
        let args = Args::parse_from(["stratadump", "--url", "postgres://localhost/app"]);
        assert_eq!(args.url.as_deref(), Some("postgres://localhost/app"));
        assert!(args.dialect.is_none());
        assert!(args.include.is_empty());
        assert!(!args.no_exclude_system_tables);
        assert!(args.report_format.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_parse_full_args() {
        let args = Args::parse_from([
            "stratadump",
            "--url",
            "mysql://localhost/shop",
            "-d",
            "mariadb",
            "-s",
            "shop",
            "--include",
            "orders,order_*",
            "--include",
            "users",
            "--exclude",
            "temp_*",
            "--no-exclude-system-tables",
            "-o",
            "-",
            "-f",
            "json",
            "--report-file",
            "report.json",
            "--compact",
            "--strict",
            "-vv",
        ]);
        assert_eq!(args.dialect, Some(DialectArg::Mysql));
        assert_eq!(args.schema.as_deref(), Some("shop"));
        assert_eq!(args.include, vec!["orders", "order_*", "users"]);
        assert_eq!(args.exclude, vec!["temp_*"]);
        assert!(args.no_exclude_system_tables);
        assert_eq!(args.output.unwrap().to_str().unwrap(), "-");
        assert_eq!(args.report_format, Some(ReportFormat::Json));
        assert_eq!(
            args.report_file.unwrap().to_str().unwrap(),
            "report.json"
        );
        assert!(args.compact);
        assert!(args.strict);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_output_conflicts_with_output_dir() {
        let result = Args::try_parse_from([
            "stratadump",
            "-o",
            "backup.sql",
            "--output-dir",
            "backups",
        ]);
        assert!(result.is_err());
    }
}
