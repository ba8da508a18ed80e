//! Catalog reading: raw table metadata from a live database.
//!
//! [`Catalog`] is the seam between introspection and the database. The
//! implementation for [`rusqlite::Connection`] reads `sqlite_master` and the
//! `pragma_table_info`, `pragma_index_list`, `pragma_index_info`, and
//! `pragma_foreign_key_list` table-valued functions. Rows are returned as
//! the database reports them; mapping them onto the design model is left to
//! [`introspect`](crate::introspect_table).

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::Result;

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub ordinal: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    /// Default expression as stored, e.g. `'abc'` with its quotes.
    pub default_value: Option<String>,
    /// Position in the primary key (1-based), or 0.
    pub pk_ordinal: i64,
}

/// One row of `PRAGMA index_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub name: String,
    pub unique: bool,
    /// `c` (CREATE INDEX), `u` (UNIQUE constraint), or `pk` (primary key).
    pub origin: String,
}

/// One row of `PRAGMA index_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumnRow {
    pub ordinal: i64,
    /// Ordinal of the indexed table column; negative for rowid or
    /// expressions.
    pub column_ordinal: i64,
}

/// One column mapping of `PRAGMA foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub column: String,
    pub target_table: String,
    /// `None` when the reference names only the table (implicit primary key).
    pub target_column: Option<String>,
    pub on_delete: String,
    pub on_update: String,
}

/// Read access to a database's table metadata.
pub trait Catalog {
    /// Names of user tables, internal `sqlite_*` tables excluded.
    fn list_tables(&self) -> Result<Vec<String>>;

    fn has_table(&self, table: &str) -> Result<bool>;

    fn columns_of(&self, table: &str) -> Result<Vec<ColumnRow>>;

    fn indexes_of(&self, table: &str) -> Result<Vec<IndexRow>>;

    fn index_columns(&self, index: &str) -> Result<Vec<IndexColumnRow>>;

    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRow>>;

    /// Stored `CREATE TABLE` text, if the table exists.
    fn ddl_of(&self, table: &str) -> Result<Option<String>>;
}

impl Catalog for Connection {
    fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn has_table(&self, table: &str) -> Result<bool> {
        let count: i64 = self.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn columns_of(&self, table: &str) -> Result<Vec<ColumnRow>> {
        let mut stmt = self.prepare(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = stmt
            .query_map(params![table], |row| {
                Ok(ColumnRow {
                    ordinal: row.get(0)?,
                    name: row.get(1)?,
                    declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    default_value: row.get(4)?,
                    pk_ordinal: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn indexes_of(&self, table: &str) -> Result<Vec<IndexRow>> {
        let mut stmt =
            self.prepare("SELECT name, \"unique\", origin FROM pragma_index_list(?1) ORDER BY seq")?;
        let rows = stmt
            .query_map(params![table], |row| {
                Ok(IndexRow {
                    name: row.get(0)?,
                    unique: row.get::<_, i64>(1)? != 0,
                    origin: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn index_columns(&self, index: &str) -> Result<Vec<IndexColumnRow>> {
        let mut stmt =
            self.prepare("SELECT seqno, cid FROM pragma_index_info(?1) ORDER BY seqno")?;
        let rows = stmt
            .query_map(params![index], |row| {
                Ok(IndexColumnRow {
                    ordinal: row.get(0)?,
                    column_ordinal: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let mut stmt = self.prepare(
            "SELECT \"from\", \"table\", \"to\", on_delete, on_update FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
        )?;
        let rows = stmt
            .query_map(params![table], |row| {
                Ok(ForeignKeyRow {
                    column: row.get(0)?,
                    target_table: row.get(1)?,
                    target_column: row.get(2)?,
                    on_delete: row.get(3)?,
                    on_update: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn ddl_of(&self, table: &str) -> Result<Option<String>> {
        let sql = self
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(sql.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
CREATE TABLE parent (id INTEGER PRIMARY KEY, code TEXT UNIQUE);
CREATE TABLE child (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL DEFAULT 'x',
    FOREIGN KEY (parent_id) REFERENCES parent(id) ON DELETE CASCADE
);
CREATE UNIQUE INDEX idx_child_parent ON child(parent_id);
"#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_list_tables_excludes_internal_tables() {
        let conn = conn();
        // AUTOINCREMENT creates sqlite_sequence
        assert!(conn.has_table("sqlite_sequence").unwrap());
        assert_eq!(conn.list_tables().unwrap(), vec!["parent", "child"]);
    }

    #[test]
    fn test_has_table() {
        fn through_trait(catalog: &dyn Catalog, table: &str) -> bool {
            catalog.has_table(table).unwrap()
        }

        let conn = conn();
        assert!(conn.has_table("parent").unwrap());
        assert!(!conn.has_table("ghost").unwrap());
        assert!(through_trait(&conn, "child"));
        assert!(!through_trait(&conn, "idx_child_parent"));
    }

    #[test]
    fn test_columns_of() {
        let conn = conn();
        let columns = conn.columns_of("child").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].pk_ordinal, 1);
        assert_eq!(columns[1].declared_type, "INTEGER");
        assert!(columns[1].not_null);
        assert_eq!(columns[1].default_value.as_deref(), Some("'x'"));
    }

    #[test]
    fn test_indexes_and_index_columns() {
        let conn = conn();
        let indexes = conn.indexes_of("parent").unwrap();
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].unique);
        assert_eq!(indexes[0].origin, "u");
        let columns = conn.index_columns(&indexes[0].name).unwrap();
        assert_eq!(columns[0].column_ordinal, 1);

        let child = conn.indexes_of("child").unwrap();
        assert!(child.iter().any(|idx| idx.name == "idx_child_parent" && idx.origin == "c"));
    }

    #[test]
    fn test_foreign_keys_of() {
        let conn = conn();
        let fks = conn.foreign_keys_of("child").unwrap();
        assert_eq!(
            fks,
            vec![ForeignKeyRow {
                column: "parent_id".into(),
                target_table: "parent".into(),
                target_column: Some("id".into()),
                on_delete: "CASCADE".into(),
                on_update: "NO ACTION".into(),
            }]
        );
    }

    #[test]
    fn test_ddl_of() {
        let conn = conn();
        assert!(conn.ddl_of("child").unwrap().unwrap().contains("AUTOINCREMENT"));
        assert_eq!(conn.ddl_of("missing").unwrap(), None);
    }
}
