//! Per-dialect rendering of DDL, DML and literals.
//!
//! Every identifier that reaches a rendered statement goes through
//! [`Dialect::quote_identifier`], which rejects names failing the safe-identifier
//! check before quoting them.

mod mysql;
mod postgres;

use crate::error::{BackupError, IdentifierKind};
use crate::identifier::{ensure_safe_identifier, quote_with};
use crate::types::{
    CellValue, ColumnDefinition, ColumnKind, Dialect, ForeignKeyConstraint, IdentityKind,
    KeyConstraint, ReferentialAction, TableDefinition,
};
use regex::Regex;
use sqlparser::ast::Ident;
use std::sync::OnceLock;

/// Tables created by spatial extensions, skipped for every dialect.
pub const SPATIAL_TABLE_PATTERNS: &[&str] = &[
    "spatial_ref_sys",
    "geometry_columns",
    "geography_columns",
    "raster_columns",
    "raster_overviews",
    "topology",
    "layer",
];

/// Bookkeeping tables of common migration tools, plus double-underscore tables.
pub const MIGRATION_TABLE_PATTERNS: &[&str] = &[
    "flyway_schema_history",
    "schema_version",
    "databasechangelog",
    "databasechangeloglock",
    "schema_migrations",
    "ar_internal_metadata",
    "django_migrations",
    "alembic_version",
    "knex_migrations",
    "knex_migrations_lock",
    "_sqlx_migrations",
    "__*",
];

/// Whether the inline `CREATE TABLE` keeps foreign-key clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeys {
    /// Phased scripts add foreign keys after the data.
    Omit,
    /// Fallback scripts keep each table self-contained.
    Inline,
}

fn numeric_literal_regex() -> &'static Regex {
    static NUMERIC_LITERAL: OnceLock<Regex> = OnceLock::new();
    NUMERIC_LITERAL.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("Invalid regex pattern")
    })
}

/// Lowercased type name without modifiers: `numeric(10,2)` becomes `numeric`.
pub(crate) fn base_type(data_type: &str) -> String {
    let lowered = data_type.trim().to_ascii_lowercase();
    let end = lowered.find('(').unwrap_or(lowered.len());
    lowered[..end].trim().to_string()
}

fn is_hex(value: &str) -> bool {
    value.chars().all(|c| c.is_ascii_hexdigit())
}

impl Dialect {
    pub fn quote_char(&self) -> char {
        match self {
            Self::Postgres => '"',
            Self::Mysql => '`',
        }
    }

    /// Quote a script identifier after checking it is safe.
    pub fn quote_identifier(&self, name: &str, kind: IdentifierKind) -> Result<String, BackupError> {
        let name = ensure_safe_identifier(name, kind)?;
        Ok(Ident::with_quote(self.quote_char(), name).to_string())
    }

    /// Quote a schema name for the row-reading query. Schema names never appear
    /// in the script, so they are escaped instead of rejected.
    pub fn quote_schema(&self, schema: &str) -> String {
        quote_with(schema, self.quote_char())
    }

    /// Default system-table patterns: the dialect's catalog tables, spatial
    /// extension tables and migration-tool tables.
    pub fn system_table_patterns(&self) -> Vec<&'static str> {
        let catalog = match self {
            Self::Postgres => postgres::SYSTEM_TABLE_PATTERNS,
            Self::Mysql => mysql::SYSTEM_TABLE_PATTERNS,
        };
        catalog
            .iter()
            .chain(SPATIAL_TABLE_PATTERNS)
            .chain(MIGRATION_TABLE_PATTERNS)
            .copied()
            .collect()
    }

    /// Session settings emitted at the top of every script.
    pub fn preamble(&self) -> &'static [&'static str] {
        match self {
            Self::Postgres => postgres::PREAMBLE,
            Self::Mysql => mysql::PREAMBLE,
        }
    }

    pub fn column_kind(&self, column: &ColumnDefinition) -> ColumnKind {
        match self {
            Self::Postgres => postgres::column_kind(&column.data_type),
            Self::Mysql => mysql::column_kind(&column.data_type),
        }
    }

    pub fn render_drop_table(&self, table: &str) -> Result<String, BackupError> {
        let quoted = self.quote_identifier(table, IdentifierKind::Table)?;
        Ok(match self {
            Self::Postgres => format!("DROP TABLE IF EXISTS {quoted} CASCADE;"),
            Self::Mysql => format!("DROP TABLE IF EXISTS {quoted};"),
        })
    }

    /// Render `CREATE TABLE` for `table`.
    ///
    /// Native DDL is used when present; with [`ForeignKeys::Omit`] its foreign-key
    /// lines are removed. Otherwise the statement is built from the column and
    /// key definitions, preceded on PostgreSQL by a `CREATE SEQUENCE` for each
    /// sequence a `nextval` default needs and `SERIAL` does not create.
    pub fn render_create_table(
        &self,
        table: &TableDefinition,
        foreign_keys: ForeignKeys,
    ) -> Result<String, BackupError> {
        let quoted_table = self.quote_identifier(&table.name, IdentifierKind::Table)?;
        for column in &table.columns {
            ensure_safe_identifier(&column.name, IdentifierKind::Column)?;
        }

        if let Some(ddl) = table.native_ddl.as_deref() {
            let ddl = ddl.trim().trim_end_matches(';').trim_end();
            let ddl = match foreign_keys {
                ForeignKeys::Omit => strip_foreign_key_lines(ddl),
                ForeignKeys::Inline => ddl.to_string(),
            };
            return Ok(format!("{ddl};"));
        }

        let mut lines = Vec::with_capacity(table.columns.len() + 2);
        for column in &table.columns {
            lines.push(self.render_column(column)?);
        }
        if let Some(pk) = &table.primary_key {
            lines.push(self.render_key("PRIMARY KEY", pk)?);
        }
        for unique in &table.unique_constraints {
            let keyword = match self {
                Self::Postgres => "UNIQUE",
                Self::Mysql => "UNIQUE KEY",
            };
            lines.push(self.render_key(keyword, unique)?);
        }
        if foreign_keys == ForeignKeys::Inline {
            for constraint in ForeignKeyConstraint::group(&table.foreign_keys) {
                lines.push(self.render_foreign_key_clause(&constraint)?);
            }
        }

        let indent = match self {
            Self::Postgres => "    ",
            Self::Mysql => "  ",
        };
        let body = lines
            .iter()
            .map(|line| format!("{indent}{line}"))
            .collect::<Vec<_>>()
            .join(",\n");
        let create = format!("CREATE TABLE {quoted_table} (\n{body}\n);");
        let sequences = match self {
            Self::Postgres => postgres::standalone_sequences(table),
            Self::Mysql => Vec::new(),
        };
        if sequences.is_empty() {
            return Ok(create);
        }
        Ok(format!("{}\n{create}", sequences.join("\n")))
    }

    fn render_column(&self, column: &ColumnDefinition) -> Result<String, BackupError> {
        let name = self.quote_identifier(&column.name, IdentifierKind::Column)?;
        let definition = match self {
            Self::Postgres => postgres::column_definition(column),
            Self::Mysql => mysql::column_definition(column),
        };
        Ok(format!("{name} {definition}"))
    }

    fn render_key(&self, keyword: &str, key: &KeyConstraint) -> Result<String, BackupError> {
        let columns = self.quote_list(&key.columns)?;
        match (&key.name, self) {
            // MySQL names its primary key PRIMARY and rejects any other name.
            (Some(_), Self::Mysql) if keyword == "PRIMARY KEY" => {
                Ok(format!("{keyword} ({columns})"))
            }
            (Some(name), Self::Postgres) => {
                let name = self.quote_identifier(name, IdentifierKind::Constraint)?;
                Ok(format!("CONSTRAINT {name} {keyword} ({columns})"))
            }
            (Some(name), Self::Mysql) => {
                let name = self.quote_identifier(name, IdentifierKind::Constraint)?;
                Ok(format!("{keyword} {name} ({columns})"))
            }
            (None, _) => Ok(format!("{keyword} ({columns})")),
        }
    }

    fn quote_list(&self, columns: &[String]) -> Result<String, BackupError> {
        let quoted = columns
            .iter()
            .map(|c| self.quote_identifier(c, IdentifierKind::Column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(quoted.join(", "))
    }

    fn render_foreign_key_clause(
        &self,
        constraint: &ForeignKeyConstraint,
    ) -> Result<String, BackupError> {
        let name = self.quote_identifier(&constraint.name, IdentifierKind::Constraint)?;
        let parent = self.quote_identifier(&constraint.parent_table, IdentifierKind::Table)?;
        let child_columns = self.quote_list(&constraint.child_columns)?;
        let parent_columns = self.quote_list(&constraint.parent_columns)?;

        let mut clause = format!(
            "CONSTRAINT {name} FOREIGN KEY ({child_columns}) REFERENCES {parent} ({parent_columns})"
        );
        for (keyword, action) in [
            ("ON DELETE", constraint.on_delete),
            ("ON UPDATE", constraint.on_update),
        ] {
            if let Some(action) = action.filter(|a| *a != ReferentialAction::NoAction) {
                clause.push_str(&format!(" {keyword} {}", action.as_sql()));
            }
        }
        Ok(clause)
    }

    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY ... REFERENCES ...`.
    pub fn render_add_constraint(
        &self,
        constraint: &ForeignKeyConstraint,
    ) -> Result<String, BackupError> {
        let child = self.quote_identifier(&constraint.child_table, IdentifierKind::Table)?;
        let clause = self.render_foreign_key_clause(constraint)?;
        Ok(format!("ALTER TABLE {child} ADD {clause};"))
    }

    /// Query reading every row of `table` as text, one value per column, in
    /// primary-key order when the table has one.
    pub fn select_rows_sql(
        &self,
        schema: &str,
        table: &TableDefinition,
    ) -> Result<String, BackupError> {
        let quoted_table = self.quote_identifier(&table.name, IdentifierKind::Table)?;
        let mut projections = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let quoted = self.quote_identifier(&column.name, IdentifierKind::Column)?;
            let binary = self.column_kind(column) == ColumnKind::Binary;
            projections.push(match (self, binary) {
                (Self::Postgres, true) => format!("encode({quoted}, 'hex')"),
                (Self::Postgres, false) => format!("{quoted}::text"),
                (Self::Mysql, true) => format!("HEX({quoted})"),
                (Self::Mysql, false) => format!("CAST({quoted} AS CHAR)"),
            });
        }

        let mut sql = format!(
            "SELECT {} FROM {}.{}",
            projections.join(", "),
            self.quote_schema(schema),
            quoted_table
        );
        if let Some(pk) = table.primary_key.as_ref().filter(|pk| !pk.columns.is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.quote_list(&pk.columns)?);
        }
        Ok(sql)
    }

    /// Prepare the per-row `INSERT` renderer for `table`.
    pub fn insert_template(&self, table: &TableDefinition) -> Result<InsertTemplate, BackupError> {
        let quoted_table = self.quote_identifier(&table.name, IdentifierKind::Table)?;
        let columns = self.quote_list(
            &table
                .columns
                .iter()
                .map(|c| c.name.clone())
                .collect::<Vec<_>>(),
        )?;
        let overriding = *self == Self::Postgres
            && table
                .columns
                .iter()
                .any(|c| c.identity == Some(IdentityKind::Always));

        let prefix = if overriding {
            format!("INSERT INTO {quoted_table} ({columns}) OVERRIDING SYSTEM VALUE VALUES (")
        } else {
            format!("INSERT INTO {quoted_table} ({columns}) VALUES (")
        };

        Ok(InsertTemplate {
            dialect: *self,
            table: table.name.clone(),
            prefix,
            kinds: table.columns.iter().map(|c| self.column_kind(c)).collect(),
        })
    }

    /// Statements moving sequences past the restored data. Only PostgreSQL
    /// needs them; MySQL advances `AUTO_INCREMENT` on insert.
    pub fn sequence_resets(&self, table: &TableDefinition) -> Result<Vec<String>, BackupError> {
        match self {
            Self::Postgres => postgres::sequence_resets(self, table),
            Self::Mysql => Ok(Vec::new()),
        }
    }

    /// Render a value as a literal of the given column kind.
    pub fn render_value(&self, kind: ColumnKind, value: Option<&str>) -> String {
        let Some(value) = value else {
            return "NULL".to_string();
        };
        match kind {
            ColumnKind::Numeric if numeric_literal_regex().is_match(value) => value.to_string(),
            ColumnKind::Boolean => match value.to_ascii_lowercase().as_str() {
                "t" | "true" => "TRUE".to_string(),
                "f" | "false" => "FALSE".to_string(),
                _ => self.string_literal(value),
            },
            ColumnKind::Binary if is_hex(value) => {
                // HEX(b'101') yields an odd number of digits.
                let padded = if value.len() % 2 == 1 {
                    format!("0{value}")
                } else {
                    value.to_string()
                };
                match self {
                    Self::Postgres => format!("decode('{padded}', 'hex')"),
                    Self::Mysql => format!("X'{padded}'"),
                }
            }
            _ => self.string_literal(value),
        }
    }

    /// Escape `value` as a string literal.
    pub fn string_literal(&self, value: &str) -> String {
        match self {
            Self::Postgres => postgres::string_literal(value),
            Self::Mysql => mysql::string_literal(value),
        }
    }
}

/// Remove foreign-key clauses from native `CREATE TABLE` text, repairing the
/// comma left dangling before the closing parenthesis.
pub fn strip_foreign_key_lines(ddl: &str) -> String {
    static FOREIGN_KEY_LINE: OnceLock<Regex> = OnceLock::new();
    let re = FOREIGN_KEY_LINE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(CONSTRAINT\s+\S+\s+)?FOREIGN\s+KEY\b").expect("Invalid regex pattern")
    });

    let mut kept: Vec<String> = ddl
        .lines()
        .filter(|line| !re.is_match(line))
        .map(str::to_string)
        .collect();

    for i in 0..kept.len().saturating_sub(1) {
        if kept[i + 1].trim_start().starts_with(')') {
            let trimmed = kept[i].trim_end();
            if let Some(without_comma) = trimmed.strip_suffix(',') {
                kept[i] = without_comma.to_string();
            }
        }
    }

    kept.join("\n")
}

/// Renders `INSERT` statements for one table, one row at a time.
#[derive(Debug, Clone)]
pub struct InsertTemplate {
    dialect: Dialect,
    table: String,
    prefix: String,
    kinds: Vec<ColumnKind>,
}

impl InsertTemplate {
    pub fn render(&self, row: &[CellValue]) -> Result<String, BackupError> {
        if row.len() != self.kinds.len() {
            return Err(BackupError::RowShape {
                table: self.table.clone(),
                expected: self.kinds.len(),
                actual: row.len(),
            });
        }

        let mut statement = String::with_capacity(self.prefix.len() + row.len() * 16);
        statement.push_str(&self.prefix);
        for (i, (kind, value)) in self.kinds.iter().zip(row).enumerate() {
            if i > 0 {
                statement.push_str(", ");
            }
            statement.push_str(&self.dialect.render_value(*kind, value.as_deref()));
        }
        statement.push_str(");");
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ForeignKeyEdge;

    fn users() -> TableDefinition {
        TableDefinition::new(
            "users",
            vec![
                ColumnDefinition::new("id", "integer")
                    .not_null()
                    .with_default("nextval('users_id_seq'::regclass)"),
                ColumnDefinition::new("email", "character varying(255)").not_null(),
                ColumnDefinition::new("active", "boolean").with_default("true"),
            ],
        )
        .with_primary_key(Some("users_pkey"), &["id"])
        .with_unique(Some("users_email_key"), &["email"])
    }

    #[test]
    fn test_quote_identifier_rejects_unsafe_names() {
        assert_eq!(
            Dialect::Postgres
                .quote_identifier("users", IdentifierKind::Table)
                .expect("safe"),
            "\"users\""
        );
        assert_eq!(
            Dialect::Mysql
                .quote_identifier("users", IdentifierKind::Table)
                .expect("safe"),
            "`users`"
        );
        assert!(matches!(
            Dialect::Postgres.quote_identifier("users\"; DROP", IdentifierKind::Table),
            Err(BackupError::UnsafeIdentifier { .. })
        ));
    }

    #[test]
    fn test_postgres_create_table_without_foreign_keys() {
        let table = users().with_foreign_key(ForeignKeyEdge::new(
            "users", "teams", "users_team_fk", "team_id", "id",
        ));
        let ddl = Dialect::Postgres
            .render_create_table(&table, ForeignKeys::Omit)
            .expect("render");

        assert_eq!(
            ddl,
            "CREATE TABLE \"users\" (\n    \"id\" SERIAL NOT NULL,\n    \"email\" character varying(255) NOT NULL,\n    \"active\" boolean DEFAULT true,\n    CONSTRAINT \"users_pkey\" PRIMARY KEY (\"id\"),\n    CONSTRAINT \"users_email_key\" UNIQUE (\"email\")\n);"
        );
        assert!(!ddl.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_postgres_create_table_creates_unowned_sequence_first() {
        let table = TableDefinition::new(
            "invoices",
            vec![ColumnDefinition::new("number", "numeric(12,0)")
                .not_null()
                .with_default("nextval('invoice_number_seq'::regclass)")],
        );
        let ddl = Dialect::Postgres
            .render_create_table(&table, ForeignKeys::Omit)
            .expect("render");

        assert_eq!(
            ddl,
            "CREATE SEQUENCE IF NOT EXISTS invoice_number_seq;\nCREATE TABLE \"invoices\" (\n    \"number\" numeric(12,0) DEFAULT nextval('invoice_number_seq'::regclass) NOT NULL\n);"
        );
        let mysql = Dialect::Mysql
            .render_create_table(&table, ForeignKeys::Omit)
            .expect("render");
        assert!(!mysql.contains("SEQUENCE"));
    }

    #[test]
    fn test_inline_foreign_keys_keep_actions() {
        let table = TableDefinition::new(
            "orders",
            vec![ColumnDefinition::new("user_id", "integer")],
        )
        .with_foreign_key(
            ForeignKeyEdge::new("orders", "users", "orders_user_fk", "user_id", "id")
                .with_actions(Some(ReferentialAction::Cascade), None),
        );
        let ddl = Dialect::Postgres
            .render_create_table(&table, ForeignKeys::Inline)
            .expect("render");
        assert!(ddl.contains(
            "CONSTRAINT \"orders_user_fk\" FOREIGN KEY (\"user_id\") REFERENCES \"users\" (\"id\") ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_strip_foreign_key_lines_from_native_ddl() {
        let ddl = "CREATE TABLE `orders` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  `user_id` int NOT NULL,\n  PRIMARY KEY (`id`),\n  KEY `orders_user_fk` (`user_id`),\n  CONSTRAINT `orders_user_fk` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

        let stripped = strip_foreign_key_lines(ddl);
        assert_eq!(
            stripped,
            "CREATE TABLE `orders` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  `user_id` int NOT NULL,\n  PRIMARY KEY (`id`),\n  KEY `orders_user_fk` (`user_id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn test_add_constraint_groups_composite_columns() {
        let edges = vec![
            ForeignKeyEdge::new("line", "header", "line_header_fk", "doc_id", "id"),
            ForeignKeyEdge::new("line", "header", "line_header_fk", "doc_rev", "rev"),
        ];
        let constraint = &ForeignKeyConstraint::group(&edges)[0];
        assert_eq!(
            Dialect::Mysql.render_add_constraint(constraint).expect("render"),
            "ALTER TABLE `line` ADD CONSTRAINT `line_header_fk` FOREIGN KEY (`doc_id`, `doc_rev`) REFERENCES `header` (`id`, `rev`);"
        );
    }

    #[test]
    fn test_render_value_by_kind() {
        let pg = Dialect::Postgres;
        assert_eq!(pg.render_value(ColumnKind::Numeric, None), "NULL");
        assert_eq!(pg.render_value(ColumnKind::Numeric, Some("-12.50")), "-12.50");
        assert_eq!(pg.render_value(ColumnKind::Numeric, Some("1e10")), "1e10");
        assert_eq!(pg.render_value(ColumnKind::Numeric, Some("NaN")), "'NaN'");
        assert_eq!(pg.render_value(ColumnKind::Numeric, Some("1; DROP")), "'1; DROP'");
        assert_eq!(pg.render_value(ColumnKind::Boolean, Some("true")), "TRUE");
        assert_eq!(pg.render_value(ColumnKind::Boolean, Some("f")), "FALSE");
        assert_eq!(
            pg.render_value(ColumnKind::Binary, Some("deadbeef")),
            "decode('deadbeef', 'hex')"
        );
        assert_eq!(Dialect::Mysql.render_value(ColumnKind::Binary, Some("5")), "X'05'");
        assert_eq!(
            pg.render_value(ColumnKind::Binary, Some("not hex")),
            "'not hex'"
        );
    }

    #[test]
    fn test_insert_template_checks_row_shape() {
        let template = Dialect::Postgres.insert_template(&users()).expect("template");
        let row = vec![
            Some("1".to_string()),
            Some("o'brien@example.com".to_string()),
            None,
        ];
        assert_eq!(
            template.render(&row).expect("render"),
            "INSERT INTO \"users\" (\"id\", \"email\", \"active\") VALUES (1, 'o''brien@example.com', NULL);"
        );

        let err = template.render(&row[..2]).expect_err("short row");
        assert!(matches!(
            err,
            BackupError::RowShape {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_select_rows_sql() {
        let table = users();
        assert_eq!(
            Dialect::Postgres
                .select_rows_sql("public", &table)
                .expect("sql"),
            "SELECT \"id\"::text, \"email\"::text, \"active\"::text FROM \"public\".\"users\" ORDER BY \"id\""
        );

        let blobs = TableDefinition::new(
            "files",
            vec![
                ColumnDefinition::new("name", "varchar(64)"),
                ColumnDefinition::new("body", "longblob"),
            ],
        );
        assert_eq!(
            Dialect::Mysql.select_rows_sql("shop", &blobs).expect("sql"),
            "SELECT CAST(`name` AS CHAR), HEX(`body`) FROM `shop`.`files`"
        );
    }

    #[test]
    fn test_system_table_patterns_cover_all_sources() {
        let patterns = Dialect::Postgres.system_table_patterns();
        assert!(patterns.contains(&"pg_*"));
        assert!(patterns.contains(&"spatial_ref_sys"));
        assert!(patterns.contains(&"__*"));
        assert!(!patterns.contains(&"mysql_*"));
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("NUMERIC(10, 2)"), "numeric");
        assert_eq!(base_type(" character varying(255)"), "character varying");
        assert_eq!(base_type("text"), "text");
    }
}
