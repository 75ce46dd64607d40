//! Re-parse a written script to catch rendering mistakes before a restore does.

use anyhow::{Context, Result};
use sqlparser::parser::Parser;
use std::path::Path;
use stratadump_core::Dialect;

/// Parse the script at `path` with the dialect's SQL grammar.
///
/// Returns the number of statements. A read failure is an error; a parse
/// failure is reported as an error carrying the parser message.
pub fn verify_script(path: &Path, dialect: Dialect) -> Result<usize> {
    let sql = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    verify_sql(&sql, dialect)
}

/// Parse script text already in memory.
pub fn verify_sql(sql: &str, dialect: Dialect) -> Result<usize> {
    let parser_dialect = dialect.to_sqlparser_dialect();
    let statements = Parser::parse_sql(&*parser_dialect, sql)
        .with_context(|| format!("script does not parse as {dialect} SQL"))?;
    Ok(statements.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_verify_counts_statements() {
        let sql = "CREATE TABLE users (id INT NOT NULL);\nINSERT INTO users (id) VALUES (1);\n";
        assert_eq!(verify_sql(sql, Dialect::Postgres).unwrap(), 2);
        assert_eq!(verify_sql(sql, Dialect::Mysql).unwrap(), 2);
    }

    #[test]
    fn test_verify_rejects_broken_script() {
        let err = verify_sql("CREATE TABLE (;", Dialect::Postgres).unwrap_err();
        assert!(format!("{err:#}").contains("does not parse as postgres SQL"));
    }

    #[test]
    fn test_verify_script_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "-- header only").unwrap();
        assert_eq!(verify_script(file.path(), Dialect::Mysql).unwrap(), 0);
    }

    #[test]
    fn test_verify_script_missing_file() {
        let err = verify_script(Path::new("/nonexistent/backup.sql"), Dialect::Mysql).unwrap_err();
        assert!(err.to_string().contains("Failed to read script"));
    }
}
