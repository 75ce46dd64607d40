#![allow(dead_code)]

use std::collections::HashMap;

use stratadump_core::{
    BackupError, CatalogError, CatalogReader, CellValue, ColumnDefinition, Dialect,
    ForeignKeyEdge, ReferentialAction, RowVisitor, TableDefinition, TableSource,
};

/// In-memory catalog with switchable failures.
#[derive(Debug, Clone)]
pub struct FakeCatalog {
    pub dialect: Dialect,
    pub current_schema: Option<String>,
    pub search_path: Option<String>,
    pub schemas: Vec<String>,
    /// Tables in catalog order.
    pub tables: Vec<TableDefinition>,
    pub rows: HashMap<String, Vec<Vec<CellValue>>>,
    pub fail_current_schema: bool,
    pub fail_list_tables: bool,
    /// Fails the schema-wide foreign-key listing.
    pub fail_foreign_keys: bool,
    /// Describes tables without their foreign keys, as a server does when
    /// the per-table lookup is refused.
    pub fail_describe_foreign_keys: bool,
    pub foreign_key_queries: usize,
    pub row_reads: Vec<String>,
}

impl FakeCatalog {
    pub fn new(dialect: Dialect, schema: &str) -> Self {
        Self {
            dialect,
            current_schema: Some(schema.to_string()),
            search_path: None,
            schemas: vec![schema.to_string()],
            tables: Vec::new(),
            rows: HashMap::new(),
            fail_current_schema: false,
            fail_list_tables: false,
            fail_foreign_keys: false,
            fail_describe_foreign_keys: false,
            foreign_key_queries: 0,
            row_reads: Vec::new(),
        }
    }

    pub fn postgres() -> Self {
        Self::new(Dialect::Postgres, "public")
    }

    pub fn mysql(database: &str) -> Self {
        Self::new(Dialect::Mysql, database)
    }

    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Vec<CellValue>>) -> Self {
        self.rows.insert(table.to_string(), rows);
        self
    }

    /// Every foreign-key lookup fails, schema-wide and per table.
    pub fn failing_foreign_keys(mut self) -> Self {
        self.fail_foreign_keys = true;
        self.fail_describe_foreign_keys = true;
        self
    }

    /// Only the schema-wide listing fails; tables still describe in full.
    pub fn failing_foreign_key_listing(mut self) -> Self {
        self.fail_foreign_keys = true;
        self
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

impl CatalogReader for FakeCatalog {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn current_schema(&mut self) -> Result<Option<String>, CatalogError> {
        if self.fail_current_schema {
            return Err(CatalogError::new("current_schema", "connection refused"));
        }
        Ok(self.current_schema.clone())
    }

    fn search_path(&mut self) -> Result<Option<String>, CatalogError> {
        Ok(self.search_path.clone())
    }

    fn schema_exists(&mut self, schema: &str) -> Result<bool, CatalogError> {
        Ok(self.schemas.iter().any(|s| s == schema))
    }

    fn list_tables(&mut self, _schema: &str) -> Result<Vec<String>, CatalogError> {
        if self.fail_list_tables {
            return Err(CatalogError::new("list_tables", "server closed the connection"));
        }
        Ok(self.table_names())
    }

    fn list_foreign_keys(
        &mut self,
        _schema: &str,
        _tables: &[String],
    ) -> Result<Vec<ForeignKeyEdge>, CatalogError> {
        self.foreign_key_queries += 1;
        if self.fail_foreign_keys {
            return Err(CatalogError::new(
                "list_foreign_keys",
                "permission denied for table pg_constraint",
            ));
        }
        Ok(self
            .tables
            .iter()
            .flat_map(|t| t.foreign_keys.iter().cloned())
            .collect())
    }
}

impl TableSource for FakeCatalog {
    fn describe_table(
        &mut self,
        _schema: &str,
        table: &str,
    ) -> Result<TableDefinition, CatalogError> {
        let definition = self
            .tables
            .iter()
            .find(|t| t.name == table)
            .cloned()
            .ok_or_else(|| CatalogError::new("describe_table", format!("no such table {table}")))?;
        if self.fail_describe_foreign_keys {
            return Ok(definition.without_foreign_keys(CatalogError::new(
                "describe_table",
                "permission denied for table pg_constraint",
            )));
        }
        Ok(definition)
    }

    fn for_each_row(
        &mut self,
        _schema: &str,
        table: &TableDefinition,
        visitor: &mut RowVisitor<'_>,
    ) -> Result<(), BackupError> {
        self.row_reads.push(table.name.clone());
        for row in self.rows.get(&table.name).into_iter().flatten() {
            visitor(row.as_slice())?;
        }
        Ok(())
    }
}

pub fn row(values: &[Option<&str>]) -> Vec<CellValue> {
    values.iter().map(|v| v.map(str::to_string)).collect()
}

pub fn fk(child: &str, parent: &str, column: &str) -> ForeignKeyEdge {
    ForeignKeyEdge::new(child, parent, format!("{child}_{column}_fkey"), column, "id")
}

fn serial_id() -> ColumnDefinition {
    ColumnDefinition::new("id", "integer")
        .not_null()
        .with_default("nextval('id_seq'::regclass)")
}

/// `users`, `products`, `orders` -> `users`, `order_items` -> `orders` and
/// `products`, listed in that catalog order.
pub fn shop_catalog() -> FakeCatalog {
    let users = TableDefinition::new(
        "users",
        vec![
            serial_id(),
            ColumnDefinition::new("email", "character varying(255)").not_null(),
            ColumnDefinition::new("active", "boolean").with_default("true"),
            ColumnDefinition::new("avatar", "bytea"),
        ],
    )
    .with_primary_key(Some("users_pkey"), &["id"])
    .with_unique(Some("users_email_key"), &["email"]);

    let products = TableDefinition::new(
        "products",
        vec![
            serial_id(),
            ColumnDefinition::new("name", "text").not_null(),
            ColumnDefinition::new("price", "numeric(10,2)"),
        ],
    )
    .with_primary_key(Some("products_pkey"), &["id"]);

    let orders = TableDefinition::new(
        "orders",
        vec![
            serial_id(),
            ColumnDefinition::new("user_id", "integer").not_null(),
            ColumnDefinition::new("created_at", "timestamp").with_default("now()"),
        ],
    )
    .with_primary_key(Some("orders_pkey"), &["id"])
    .with_foreign_key(
        fk("orders", "users", "user_id")
            .with_actions(Some(ReferentialAction::Cascade), None),
    );

    let order_items = TableDefinition::new(
        "order_items",
        vec![
            ColumnDefinition::new("order_id", "integer").not_null(),
            ColumnDefinition::new("product_id", "integer").not_null(),
            ColumnDefinition::new("quantity", "integer").not_null(),
            ColumnDefinition::new("note", "text"),
        ],
    )
    .with_primary_key(Some("order_items_pkey"), &["order_id", "product_id"])
    .with_foreign_key(fk("order_items", "orders", "order_id"))
    .with_foreign_key(fk("order_items", "products", "product_id"));

    FakeCatalog::postgres()
        .with_table(users)
        .with_table(products)
        .with_table(orders)
        .with_table(order_items)
        .with_rows(
            "users",
            vec![
                row(&[Some("1"), Some("ada@example.com"), Some("true"), Some("cafe")]),
                row(&[Some("2"), Some("o'neil@example.com"), Some("false"), None]),
            ],
        )
        .with_rows(
            "products",
            vec![row(&[Some("1"), Some("Widget"), Some("9.99")])],
        )
        .with_rows(
            "orders",
            vec![
                row(&[Some("1"), Some("1"), Some("2024-01-05 10:00:00")]),
                row(&[Some("2"), Some("2"), None]),
            ],
        )
        .with_rows(
            "order_items",
            vec![
                row(&[Some("1"), Some("1"), Some("3"), Some("gift wrap\nplease")]),
                row(&[Some("2"), Some("1"), Some("1"), None]),
            ],
        )
}

/// Byte offset of `needle` in `script`, panicking with context when absent.
pub fn offset(script: &str, needle: &str) -> usize {
    script
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in script:\n{script}"))
}
