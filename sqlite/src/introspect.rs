//! Reconstructing table designs from a live catalog.
//!
//! [`introspect_table`] maps the rows reported by a [`Catalog`] onto a
//! [`TableSpec`]. Most attributes come straight from the pragmas; two are
//! recovered by scanning the stored `CREATE TABLE` text:
//!
//! - `AUTOINCREMENT` anywhere in the text marks every `INTEGER` primary-key
//!   column as autoincrementing.
//! - The first `CHECK(...)` clause, cut at the next closing parenthesis, is
//!   attached to every column whose name occurs in the expression.
//!
//! Both scans are table-wide text heuristics; they are exact for tables
//! produced by [`create_table_sql`](table_designer_core::create_table_sql)
//! with a single check expression and non-overlapping column names.

use std::collections::{HashMap, HashSet};

use table_designer_core::{ColumnDraft, ColumnType, ForeignKey, SchemaRegistry, TableSpec};
use tracing::{debug, info};

use crate::catalog::{Catalog, ColumnRow};
use crate::error::{DesignerError, Result};

/// Reads one table back into a [`TableSpec`].
///
/// # Errors
///
/// Returns [`DesignerError::IntrospectionError`] wrapping the underlying
/// failure, including [`DesignerError::TableNotFound`] when the catalog
/// reports no columns.
pub fn introspect_table<C: Catalog + ?Sized>(catalog: &C, table: &str) -> Result<TableSpec> {
    read_table(catalog, table).map_err(|source| DesignerError::IntrospectionError {
        table: table.to_string(),
        source: Box::new(source),
    })
}

/// Reads every table into a fresh registry.
///
/// The registry is returned only if every table was read; on error nothing
/// is returned and the caller's existing registry stays as it was.
pub fn introspect_all<C: Catalog + ?Sized>(catalog: &C) -> Result<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    for name in catalog.list_tables()? {
        registry.insert_table(introspect_table(catalog, &name)?);
    }
    info!(tables = registry.len(), "introspected catalog");
    Ok(registry)
}

fn read_table<C: Catalog + ?Sized>(catalog: &C, table: &str) -> Result<TableSpec> {
    let rows = catalog.columns_of(table)?;
    if rows.is_empty() {
        return Err(DesignerError::TableNotFound(table.to_string()));
    }

    let ddl = catalog.ddl_of(table)?.unwrap_or_default();
    let autoincrement = ddl.to_ascii_uppercase().contains("AUTOINCREMENT");
    let check = extract_check(&ddl);
    let unique = unique_columns(catalog, table, &rows)?;
    let mut foreign_keys = foreign_keys(catalog, table)?;

    let mut spec = TableSpec::new(table);
    for row in &rows {
        let column_type = ColumnType::parse_declared(&row.declared_type);
        let primary_key = row.pk_ordinal != 0;
        let draft = ColumnDraft {
            name: row.name.clone(),
            auto_increment: autoincrement && primary_key && column_type.is_integer(),
            column_type,
            not_null: row.not_null,
            primary_key,
            unique: unique.contains(&row.name),
            default_value: row.default_value.as_deref().map(unquote_default),
            check: check
                .filter(|expression| expression.contains(row.name.as_str()))
                .map(str::to_string)
                .unwrap_or_default(),
            foreign_key: foreign_keys.remove(&row.name),
        };
        spec.push_column(draft.build_from_catalog()?)?;
    }

    debug!(table, columns = spec.columns().len(), "introspected table");
    Ok(spec)
}

/// Columns covered on their own by a unique index. Indexes backing the
/// primary key and multi-column unique indexes are skipped.
fn unique_columns<C: Catalog + ?Sized>(
    catalog: &C,
    table: &str,
    rows: &[ColumnRow],
) -> Result<HashSet<String>> {
    let mut unique = HashSet::new();
    for index in catalog.indexes_of(table)? {
        if !index.unique || index.origin == "pk" {
            continue;
        }
        if let [only] = catalog.index_columns(&index.name)?.as_slice() {
            if let Some(row) = rows.iter().find(|row| row.ordinal == only.column_ordinal) {
                unique.insert(row.name.clone());
            }
        }
    }
    Ok(unique)
}

fn foreign_keys<C: Catalog + ?Sized>(catalog: &C, table: &str) -> Result<HashMap<String, ForeignKey>> {
    let mut foreign_keys = HashMap::new();
    for row in catalog.foreign_keys_of(table)? {
        let column = match row.target_column {
            Some(column) => column,
            None => sole_primary_key(catalog, &row.target_table)?,
        };
        let fk = ForeignKey {
            table: row.target_table,
            column,
            on_delete: row.on_delete.parse()?,
            on_update: row.on_update.parse()?,
        };
        foreign_keys.entry(row.column).or_insert(fk);
    }
    Ok(foreign_keys)
}

fn sole_primary_key<C: Catalog + ?Sized>(catalog: &C, table: &str) -> Result<String> {
    let mut keys = catalog
        .columns_of(table)?
        .into_iter()
        .filter(|row| row.pk_ordinal != 0);
    match (keys.next(), keys.next()) {
        (Some(key), None) => Ok(key.name),
        _ => Err(DesignerError::ConversionError(format!(
            "foreign key references '{table}' without a column, and it has no single-column primary key"
        ))),
    }
}

/// Finds the first `CHECK(` in the stored DDL and returns the text up to
/// the next `)`.
pub(crate) fn extract_check(ddl: &str) -> Option<&str> {
    // ASCII uppercasing keeps byte offsets aligned with `ddl`.
    let upper = ddl.to_ascii_uppercase();
    for (start, _) in upper.match_indices("CHECK") {
        let rest = &ddl[start + "CHECK".len()..];
        let open = rest.find('(')?;
        if !rest[..open].trim().is_empty() {
            continue;
        }
        let body = &rest[open + 1..];
        let close = body.find(')')?;
        let expression = body[..close].trim();
        return (!expression.is_empty()).then_some(expression);
    }
    None
}

/// Strips one level of single quotes from a stored default, unescaping
/// doubled quotes. Anything else is returned unchanged.
pub(crate) fn unquote_default(stored: &str) -> String {
    let trimmed = stored.trim();
    match trimmed
        .strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use table_designer_core::{ForeignKeyAction, TextSubtype};

    #[test]
    fn test_extract_check() {
        assert_eq!(
            extract_check("CREATE TABLE t (a INTEGER CHECK(a > 0))"),
            Some("a > 0")
        );
        assert_eq!(
            extract_check("CREATE TABLE t (a INTEGER check ( a > 0 ))"),
            Some("a > 0")
        );
        assert_eq!(
            extract_check("CREATE TABLE t (checksum TEXT, b INTEGER CHECK(b < 5))"),
            Some("b < 5")
        );
        assert_eq!(extract_check("CREATE TABLE t (a INTEGER)"), None);
    }

    #[test]
    fn test_extract_check_stops_at_first_close_paren() {
        assert_eq!(
            extract_check("CREATE TABLE t (a TEXT CHECK(length(a) > 2))"),
            Some("length(a")
        );
    }

    #[test]
    fn test_unquote_default() {
        assert_eq!(unquote_default("'abc'"), "abc");
        assert_eq!(unquote_default("'it''s'"), "it's");
        assert_eq!(unquote_default("0"), "0");
        assert_eq!(unquote_default("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn test_introspect_maps_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE "dept" ("dept_id" INTEGER, PRIMARY KEY("dept_id" AUTOINCREMENT));
CREATE TABLE "emp" (
    "emp_id" INTEGER,
    "name" VCHAR(40) NOT NULL UNIQUE,
    "born" DATE,
    "active" BOOLEAN DEFAULT '1',
    "age" INTEGER CHECK(age >= 18),
    "dept_id" INTEGER,
    PRIMARY KEY("emp_id"),
    FOREIGN KEY ("dept_id") REFERENCES "dept"("dept_id") ON DELETE SET NULL ON UPDATE CASCADE
);
"#,
        )
        .unwrap();

        let emp = introspect_table(&conn, "emp").unwrap();
        assert_eq!(
            emp.column_names(),
            vec!["emp_id", "name", "born", "active", "age", "dept_id"]
        );

        let emp_id = emp.column("emp_id").unwrap();
        assert!(emp_id.primary_key());
        assert!(!emp_id.auto_increment());

        let name = emp.column("name").unwrap();
        assert_eq!(name.column_type(), &ColumnType::sized_text(TextSubtype::VChar, 40));
        assert!(name.not_null());
        assert!(name.unique());

        assert_eq!(emp.column("born").unwrap().column_type(), &ColumnType::Date);
        assert_eq!(emp.column("born").unwrap().column_type().effective_type(), "TEXT");

        let active = emp.column("active").unwrap();
        assert_eq!(active.column_type(), &ColumnType::Boolean);
        assert_eq!(active.default_value(), Some("1"));

        assert_eq!(emp.column("age").unwrap().check(), Some("age >= 18"));

        let fk = emp.column("dept_id").unwrap().foreign_key().unwrap();
        assert_eq!(fk.table, "dept");
        assert_eq!(fk.column, "dept_id");
        assert_eq!(fk.on_delete, ForeignKeyAction::SetNull);
        assert_eq!(fk.on_update, ForeignKeyAction::Cascade);

        let dept = introspect_table(&conn, "dept").unwrap();
        assert!(dept.column("dept_id").unwrap().auto_increment());
    }

    #[test]
    fn test_primary_key_index_does_not_mark_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(r#"CREATE TABLE "codes" ("code" CHAR(3), "label" TEXT, PRIMARY KEY("code"));"#)
            .unwrap();
        let codes = introspect_table(&conn, "codes").unwrap();
        assert!(codes.column("code").unwrap().primary_key());
        assert!(!codes.column("code").unwrap().unique());
    }

    #[test]
    fn test_multi_column_unique_index_is_not_per_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER, b INTEGER, UNIQUE(a, b));")
            .unwrap();
        let t = introspect_table(&conn, "t").unwrap();
        assert!(!t.column("a").unwrap().unique());
        assert!(!t.column("b").unwrap().unique());
    }

    #[test]
    fn test_foreign_key_to_implicit_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE p (pid INTEGER PRIMARY KEY); CREATE TABLE c (pid INTEGER REFERENCES p);",
        )
        .unwrap();
        let c = introspect_table(&conn, "c").unwrap();
        assert_eq!(c.column("pid").unwrap().foreign_key().unwrap().column, "pid");
    }

    #[test]
    fn test_set_default_action_and_empty_default() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE "p" ("pid" INTEGER PRIMARY KEY);
CREATE TABLE "c" (
    "pid" INTEGER DEFAULT 0 REFERENCES "p"("pid") ON DELETE SET DEFAULT ON UPDATE SET DEFAULT,
    "note" TEXT NOT NULL DEFAULT ''
);
"#,
        )
        .unwrap();

        let c = introspect_table(&conn, "c").unwrap();
        let fk = c.column("pid").unwrap().foreign_key().unwrap();
        assert_eq!(fk.on_delete, ForeignKeyAction::SetDefault);
        assert_eq!(fk.on_update, ForeignKeyAction::SetDefault);
        assert_eq!(c.column("note").unwrap().default_value(), Some(""));

        let sql = table_designer_core::create_table_sql(&c);
        assert!(sql.contains(r#""note" TEXT NOT NULL DEFAULT ''"#), "{sql}");
        assert!(sql.contains("ON DELETE SET DEFAULT ON UPDATE SET DEFAULT"), "{sql}");
    }

    #[test]
    fn test_primary_key_flags_read_back_normalized() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(r#"CREATE TABLE "codes" ("code" CHAR(3) NOT NULL UNIQUE PRIMARY KEY);"#)
            .unwrap();
        let code = introspect_table(&conn, "codes").unwrap();
        let column = code.column("code").unwrap();
        assert!(column.primary_key());
        assert!(!column.not_null());
        assert!(!column.unique());
    }

    #[test]
    fn test_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = introspect_table(&conn, "ghost").unwrap_err();
        match err {
            DesignerError::IntrospectionError { table, source } => {
                assert_eq!(table, "ghost");
                assert!(matches!(*source, DesignerError::TableNotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_introspect_all_in_catalog_order() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE b (x INTEGER); CREATE TABLE a (y TEXT);")
            .unwrap();
        let registry = introspect_all(&conn).unwrap();
        assert_eq!(registry.table_names(), vec!["b", "a"]);
    }
}
