//! Applying a table design to the database.
//!
//! [`apply_table`] creates a table that does not exist yet, or rebuilds an
//! existing one to match the design:
//!
//! 1. create `temp_<name>` from the design,
//! 2. copy the columns present in both the live table and the design (in
//!    live column order),
//! 3. drop the live table,
//! 4. rename the temporary table to the original name.
//!
//! Columns only in the live table are dropped with their data; columns only
//! in the design start at their default. The whole sequence runs in one
//! transaction, so a failure at any step rolls everything back and leaves
//! no temporary table behind. Foreign-key enforcement is suspended during
//! the rebuild (dropping a referenced table would otherwise fire its
//! `ON DELETE` actions). Before the transaction commits,
//! `PRAGMA foreign_key_check` must come back clean for the rebuilt table and
//! for every table that references it; other tables are not inspected.

use rusqlite::Connection;
use table_designer_core::{
    TableSpec, copy_rows_sql, create_table_sql, create_table_sql_named, drop_table_sql,
    quote_identifier, rename_table_sql, validate_table,
};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{DesignerError, Result};

/// Prefix of the temporary table used while rebuilding.
pub const TEMP_TABLE_PREFIX: &str = "temp_";

/// Result of a successful [`apply_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The table did not exist and was created.
    Created,
    /// The table existed and was rebuilt.
    Migrated {
        /// Columns whose data was carried over.
        copied: Vec<String>,
        /// Live columns absent from the design; their data is gone.
        dropped: Vec<String>,
        /// Design columns that did not exist before.
        added: Vec<String>,
    },
}

/// Creates or rebuilds `table` so the database matches the design.
///
/// # Errors
///
/// Returns [`DesignerError::ValidationError`] if the design fails
/// [`validate_table`] (nothing is executed),
/// [`DesignerError::MigrationError`] carrying the backend message if a
/// rebuild step fails, and [`DesignerError::ForeignKeyViolation`] if the
/// rebuilt data breaks a foreign key. In every error case the transaction
/// is rolled back.
///
/// # Examples
///
/// ```
/// use rusqlite::Connection;
/// use table_designer_core::*;
/// use table_designer_sqlite::{ApplyOutcome, apply_table};
///
/// let conn = Connection::open_in_memory().unwrap();
/// let mut registry = SchemaRegistry::new();
/// registry.add_table("notes").unwrap();
/// registry
///     .add_column("notes", ColumnDraft::new("id", ColumnType::Integer).primary_key())
///     .unwrap();
///
/// let table = registry.get("notes").unwrap();
/// assert_eq!(apply_table(&conn, table).unwrap(), ApplyOutcome::Created);
/// assert!(matches!(apply_table(&conn, table).unwrap(), ApplyOutcome::Migrated { .. }));
/// ```
pub fn apply_table(conn: &Connection, table: &TableSpec) -> Result<ApplyOutcome> {
    if let Some(err) = validate_table(table).into_iter().next() {
        return Err(err.into());
    }

    if conn.has_table(table.name())? {
        migrate(conn, table)
    } else {
        create(conn, table)
    }
}

fn create(conn: &Connection, table: &TableSpec) -> Result<ApplyOutcome> {
    let sql = create_table_sql(table);
    let tx = conn.unchecked_transaction()?;
    debug!(%sql, "creating table");
    tx.execute_batch(&sql)?;
    tx.commit()?;
    info!(table = table.name(), "created table");
    Ok(ApplyOutcome::Created)
}

fn migrate(conn: &Connection, table: &TableSpec) -> Result<ApplyOutcome> {
    let suspension = ForeignKeySuspension::begin(conn)?;
    let tx = conn.unchecked_transaction()?;

    match rebuild(&tx, table, suspension.was_enabled) {
        Ok(outcome) => {
            tx.commit()?;
            info!(table = table.name(), ?outcome, "rebuilt table");
            Ok(outcome)
        }
        Err(err) => {
            warn!(table = table.name(), %err, "rebuild failed, rolling back");
            Err(err)
        }
    }
}

fn rebuild(conn: &Connection, table: &TableSpec, check_foreign_keys: bool) -> Result<ApplyOutcome> {
    let name = table.name();
    let temp = format!("{TEMP_TABLE_PREFIX}{name}");

    let create = create_table_sql_named(table, &temp);
    debug!(sql = %create, "creating temporary table");
    conn.execute_batch(&create).map_err(|e| {
        DesignerError::MigrationError(format!("failed to create temporary table '{temp}': {e}"))
    })?;

    let live: Vec<String> = conn
        .columns_of(name)?
        .into_iter()
        .map(|row| row.name)
        .collect();
    let designed = table.column_names();

    let copied: Vec<&str> = live
        .iter()
        .map(String::as_str)
        .filter(|column| designed.contains(column))
        .collect();
    if !copied.is_empty() {
        let copy = copy_rows_sql(name, &temp, &copied);
        debug!(sql = %copy, "copying rows");
        conn.execute_batch(&copy).map_err(|e| {
            DesignerError::MigrationError(format!("failed to copy rows into '{temp}': {e}"))
        })?;
    }

    conn.execute_batch(&drop_table_sql(name))
        .map_err(|e| DesignerError::MigrationError(format!("failed to drop '{name}': {e}")))?;
    conn.execute_batch(&rename_table_sql(&temp, name)).map_err(|e| {
        DesignerError::MigrationError(format!("failed to rename '{temp}' to '{name}': {e}"))
    })?;

    if check_foreign_keys {
        let violations = foreign_key_violations(conn, name)?;
        if violations > 0 {
            return Err(DesignerError::ForeignKeyViolation {
                table: name.to_string(),
                violations,
            });
        }
    }

    let dropped = live
        .iter()
        .filter(|column| !designed.contains(&column.as_str()))
        .cloned()
        .collect();
    let added = designed
        .iter()
        .filter(|column| !live.iter().any(|l| l == *column))
        .map(|column| column.to_string())
        .collect();

    Ok(ApplyOutcome::Migrated {
        copied: copied.into_iter().map(String::from).collect(),
        dropped,
        added,
    })
}

/// Counts foreign-key violations in `table` and in the tables referencing it.
fn foreign_key_violations(conn: &Connection, table: &str) -> Result<usize> {
    let mut checked = vec![table.to_string()];
    for other in conn.list_tables()? {
        if other.eq_ignore_ascii_case(table) {
            continue;
        }
        let references = conn
            .foreign_keys_of(&other)?
            .iter()
            .any(|fk| fk.target_table.eq_ignore_ascii_case(table));
        if references {
            checked.push(other);
        }
    }

    let mut violations = 0;
    for name in &checked {
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_check({})", quote_identifier(name)))?;
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {
            violations += 1;
        }
    }
    debug!(tables = ?checked, violations, "checked foreign keys");
    Ok(violations)
}

/// Turns foreign-key enforcement off for its lifetime, restoring it on drop
/// if it was on. Must outlive the rebuild transaction: the pragma is a
/// no-op inside a transaction.
struct ForeignKeySuspension<'c> {
    conn: &'c Connection,
    was_enabled: bool,
}

impl<'c> ForeignKeySuspension<'c> {
    fn begin(conn: &'c Connection) -> Result<Self> {
        let was_enabled = conn.query_row("PRAGMA foreign_keys", [], |row| row.get::<_, i64>(0))? != 0;
        if was_enabled {
            conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        }
        Ok(Self { conn, was_enabled })
    }
}

impl Drop for ForeignKeySuspension<'_> {
    fn drop(&mut self) {
        if self.was_enabled {
            if let Err(err) = self.conn.execute_batch("PRAGMA foreign_keys = ON;") {
                warn!(%err, "failed to re-enable foreign key enforcement");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_designer_core::{ColumnDraft, ColumnType, ForeignKeyAction, SchemaRegistry};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn foreign_keys_enabled(conn: &Connection) -> bool {
        conn.query_row("PRAGMA foreign_keys", [], |row| row.get::<_, i64>(0))
            .unwrap()
            != 0
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_create_new_table() {
        let conn = conn();
        let mut registry = SchemaRegistry::new();
        registry.add_table("t").unwrap();
        registry
            .add_column("t", ColumnDraft::new("id", ColumnType::Integer).primary_key())
            .unwrap();
        assert_eq!(
            apply_table(&conn, registry.get("t").unwrap()).unwrap(),
            ApplyOutcome::Created
        );
        assert!(conn.has_table("t").unwrap());
    }

    #[test]
    fn test_empty_table_is_rejected_before_execution() {
        let conn = conn();
        let err = apply_table(&conn, &TableSpec::new("t")).unwrap_err();
        assert!(matches!(err, DesignerError::ValidationError(_)));
        assert!(!conn.has_table("t").unwrap());
    }

    #[test]
    fn test_migration_preserves_common_columns() {
        let conn = conn();
        conn.execute_batch(
            r#"
CREATE TABLE t (a TEXT, b TEXT, c INTEGER);
INSERT INTO t VALUES ('a1', 'b1', 1), ('a2', 'b2', 2);
"#,
        )
        .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.add_table("t").unwrap();
        registry.add_column("t", ColumnDraft::new("b", ColumnType::text())).unwrap();
        registry.add_column("t", ColumnDraft::new("c", ColumnType::Integer)).unwrap();
        registry
            .add_column("t", ColumnDraft::new("d", ColumnType::text()).with_default("none"))
            .unwrap();

        let outcome = apply_table(&conn, registry.get("t").unwrap()).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Migrated {
                copied: vec!["b".into(), "c".into()],
                dropped: vec!["a".into()],
                added: vec!["d".into()],
            }
        );

        let mut stmt = conn.prepare("SELECT b, c, d FROM t ORDER BY c").unwrap();
        let rows: Vec<(String, i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                ("b1".to_string(), 1, "none".to_string()),
                ("b2".to_string(), 2, "none".to_string()),
            ]
        );
        assert!(!conn.has_table("temp_t").unwrap());
        assert!(foreign_keys_enabled(&conn));
    }

    #[test]
    fn test_failed_copy_rolls_back() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE t (a TEXT); INSERT INTO t VALUES ('x');")
            .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.add_table("t").unwrap();
        registry.add_column("t", ColumnDraft::new("a", ColumnType::text())).unwrap();
        // New NOT NULL column without a default cannot be filled by the copy
        registry
            .add_column("t", ColumnDraft::new("b", ColumnType::Integer).not_null())
            .unwrap();

        let err = apply_table(&conn, registry.get("t").unwrap()).unwrap_err();
        assert!(matches!(err, DesignerError::MigrationError(ref msg) if msg.contains("NOT NULL")));

        assert!(!conn.has_table("temp_t").unwrap());
        assert_eq!(conn.columns_of("t").unwrap().len(), 1);
        assert_eq!(count(&conn, "t"), 1);
        assert!(foreign_keys_enabled(&conn));
    }

    #[test]
    fn test_rebuilding_parent_keeps_cascading_children() {
        let conn = conn();
        conn.execute_batch(
            r#"
CREATE TABLE p (id INTEGER PRIMARY KEY, label TEXT);
CREATE TABLE c (id INTEGER PRIMARY KEY, pid INTEGER REFERENCES p(id) ON DELETE CASCADE);
INSERT INTO p VALUES (1, 'one');
INSERT INTO c VALUES (10, 1);
"#,
        )
        .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.add_table("p").unwrap();
        registry
            .add_column("p", ColumnDraft::new("id", ColumnType::Integer).primary_key())
            .unwrap();

        apply_table(&conn, registry.get("p").unwrap()).unwrap();
        assert_eq!(count(&conn, "c"), 1);
        assert_eq!(count(&conn, "p"), 1);
    }

    #[test]
    fn test_foreign_key_violation_rolls_back() {
        let conn = conn();
        conn.execute_batch(
            r#"
CREATE TABLE p (pid INTEGER PRIMARY KEY);
CREATE TABLE c (id INTEGER PRIMARY KEY, pid INTEGER);
INSERT INTO c VALUES (1, 99);
"#,
        )
        .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.add_table("p").unwrap();
        registry
            .add_column("p", ColumnDraft::new("pid", ColumnType::Integer).primary_key())
            .unwrap();
        registry.add_table("c").unwrap();
        registry
            .add_column("c", ColumnDraft::new("id", ColumnType::Integer).primary_key())
            .unwrap();
        registry
            .add_column(
                "c",
                ColumnDraft::new("pid", ColumnType::Integer)
                    .references("p", "pid")
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .unwrap();

        let err = apply_table(&conn, registry.get("c").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            DesignerError::ForeignKeyViolation { violations: 1, .. }
        ));
        assert!(conn.foreign_keys_of("c").unwrap().is_empty());
        assert!(!conn.has_table("temp_c").unwrap());
        assert!(foreign_keys_enabled(&conn));
    }

    #[test]
    fn test_violations_elsewhere_do_not_block_rebuild() {
        let conn = conn();
        conn.execute_batch(
            r#"
PRAGMA foreign_keys = OFF;
CREATE TABLE owners (id INTEGER PRIMARY KEY);
CREATE TABLE pets (id INTEGER PRIMARY KEY, owner INTEGER REFERENCES owners(id));
INSERT INTO pets VALUES (1, 42);
PRAGMA foreign_keys = ON;
CREATE TABLE t (a TEXT, b TEXT);
INSERT INTO t VALUES ('x', 'y');
"#,
        )
        .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.add_table("t").unwrap();
        registry.add_column("t", ColumnDraft::new("a", ColumnType::text())).unwrap();

        let outcome = apply_table(&conn, registry.get("t").unwrap()).unwrap();
        assert!(matches!(outcome, ApplyOutcome::Migrated { .. }));
        assert_eq!(count(&conn, "t"), 1);
        assert_eq!(count(&conn, "pets"), 1);
    }

    #[test]
    fn test_rebuilding_parent_checks_referencing_children() {
        let conn = conn();
        conn.execute_batch(
            r#"
PRAGMA foreign_keys = OFF;
CREATE TABLE p (pid INTEGER PRIMARY KEY, label TEXT);
CREATE TABLE c (id INTEGER PRIMARY KEY, pid INTEGER REFERENCES p(pid));
INSERT INTO p VALUES (1, 'one');
INSERT INTO c VALUES (10, 1), (11, 99);
PRAGMA foreign_keys = ON;
"#,
        )
        .unwrap();

        let mut registry = SchemaRegistry::new();
        registry.add_table("p").unwrap();
        registry
            .add_column("p", ColumnDraft::new("pid", ColumnType::Integer).primary_key())
            .unwrap();

        let err = apply_table(&conn, registry.get("p").unwrap()).unwrap_err();
        assert!(
            matches!(err, DesignerError::ForeignKeyViolation { violations: 1, ref table } if table == "p"),
            "{err}"
        );
        assert_eq!(conn.columns_of("p").unwrap().len(), 2);
        assert!(foreign_keys_enabled(&conn));
    }

    #[test]
    fn test_existing_temporary_table_aborts() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE t (a TEXT); CREATE TABLE temp_t (z BLOB);")
            .unwrap();
        let mut registry = SchemaRegistry::new();
        registry.add_table("t").unwrap();
        registry.add_column("t", ColumnDraft::new("a", ColumnType::text())).unwrap();

        let err = apply_table(&conn, registry.get("t").unwrap()).unwrap_err();
        assert!(matches!(err, DesignerError::MigrationError(_)));
        assert_eq!(conn.columns_of("temp_t").unwrap()[0].name, "z");
    }
}
