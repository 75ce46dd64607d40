//! Catalog SQL per dialect.
//!
//! Every text column is cast explicitly: the `Any` driver cannot decode
//! PostgreSQL `name`/`"char"` values, and MySQL 8 reports some
//! `information_schema` columns with a binary collation.

pub(super) mod postgres {
    pub const CURRENT_SCHEMA: &str = "SELECT current_schema()::text AS current_schema";

    pub const SEARCH_PATH: &str = "SELECT current_setting('search_path') AS search_path";

    pub const SCHEMA_EXISTS: &str = r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_catalog.pg_namespace WHERE nspname = $1
        ) AS present
    "#;

    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'BASE TABLE'
        ORDER BY table_name
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            a.attname::text AS column_name,
            pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
            a.attnotnull AS not_null,
            pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS column_default,
            a.attidentity::text AS identity
        FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
        WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
        ORDER BY a.attnum
    "#;

    pub const KEYS: &str = r#"
        SELECT
            con.conname::text AS constraint_name,
            con.contype::text AS kind,
            a.attname::text AS column_name
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class c ON c.oid = con.conrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, position)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
        WHERE n.nspname = $1 AND c.relname = $2 AND con.contype IN ('p', 'u')
        ORDER BY con.contype, con.conname, k.position
    "#;

    const FOREIGN_KEYS: &str = r#"
        SELECT
            child.relname::text AS child_table,
            parent.relname::text AS parent_table,
            con.conname::text AS constraint_name,
            child_col.attname::text AS child_column,
            parent_col.attname::text AS parent_column,
            con.confdeltype::text AS on_delete,
            con.confupdtype::text AS on_update
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class child ON child.oid = con.conrelid
        JOIN pg_catalog.pg_class parent ON parent.oid = con.confrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = child.relnamespace
        CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
            WITH ORDINALITY AS k(child_attnum, parent_attnum, position)
        JOIN pg_catalog.pg_attribute child_col
            ON child_col.attrelid = con.conrelid AND child_col.attnum = k.child_attnum
        JOIN pg_catalog.pg_attribute parent_col
            ON parent_col.attrelid = con.confrelid AND parent_col.attnum = k.parent_attnum
        WHERE con.contype = 'f' AND n.nspname = $1 AND parent.relnamespace = n.oid
    "#;

    const FOREIGN_KEYS_ORDER: &str = " ORDER BY child.relname, con.conname, k.position";

    /// Foreign keys of the whole schema, or of one child table (`$2`).
    pub fn foreign_keys(one_table: bool) -> String {
        let filter = if one_table {
            " AND child.relname = $2"
        } else {
            ""
        };
        format!("{FOREIGN_KEYS}{filter}{FOREIGN_KEYS_ORDER}")
    }
}

pub(super) mod mysql {
    pub const CURRENT_SCHEMA: &str = "SELECT CAST(DATABASE() AS CHAR) AS current_schema";

    pub const SCHEMA_EXISTS: &str = r#"
        SELECT COUNT(*) AS present
        FROM information_schema.SCHEMATA
        WHERE SCHEMA_NAME = ?
    "#;

    pub const LIST_TABLES: &str = r#"
        SELECT CAST(TABLE_NAME AS CHAR) AS table_name
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            CAST(COLUMN_NAME AS CHAR) AS column_name,
            CAST(COLUMN_TYPE AS CHAR) AS data_type,
            CAST(IS_NULLABLE AS CHAR) AS is_nullable,
            CAST(EXTRA AS CHAR) AS extra
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
    "#;

    pub const KEYS: &str = r#"
        SELECT
            CAST(tc.CONSTRAINT_NAME AS CHAR) AS constraint_name,
            CAST(tc.CONSTRAINT_TYPE AS CHAR) AS kind,
            CAST(k.COLUMN_NAME AS CHAR) AS column_name
        FROM information_schema.TABLE_CONSTRAINTS tc
        JOIN information_schema.KEY_COLUMN_USAGE k
            ON k.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
            AND k.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            AND k.TABLE_NAME = tc.TABLE_NAME
        WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
            AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
        ORDER BY tc.CONSTRAINT_TYPE, tc.CONSTRAINT_NAME, k.ORDINAL_POSITION
    "#;

    const FOREIGN_KEYS: &str = r#"
        SELECT
            CAST(k.TABLE_NAME AS CHAR) AS child_table,
            CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS parent_table,
            CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
            CAST(k.COLUMN_NAME AS CHAR) AS child_column,
            CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS parent_column,
            CAST(r.DELETE_RULE AS CHAR) AS on_delete,
            CAST(r.UPDATE_RULE AS CHAR) AS on_update
        FROM information_schema.KEY_COLUMN_USAGE k
        JOIN information_schema.REFERENTIAL_CONSTRAINTS r
            ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
            AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
            AND r.TABLE_NAME = k.TABLE_NAME
        WHERE k.TABLE_SCHEMA = ?
            AND k.REFERENCED_TABLE_NAME IS NOT NULL
            AND k.REFERENCED_TABLE_SCHEMA = k.TABLE_SCHEMA
    "#;

    const FOREIGN_KEYS_ORDER: &str =
        " ORDER BY k.TABLE_NAME, k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

    /// Foreign keys of the whole database, or of one child table (second `?`).
    pub fn foreign_keys(one_table: bool) -> String {
        let filter = if one_table { " AND k.TABLE_NAME = ?" } else { "" };
        format!("{FOREIGN_KEYS}{filter}{FOREIGN_KEYS_ORDER}")
    }
}
