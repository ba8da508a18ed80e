//! Designer sessions: one database connection plus the registry of table
//! designs read from it.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use table_designer_core::{SchemaRegistry, create_table_sql};
use tracing::info;

use crate::apply::{ApplyOutcome, apply_table};
use crate::catalog::Catalog;
use crate::design_file::DesignFile;
use crate::error::{DesignerError, Result};
use crate::introspect::introspect_all;

/// An open database and the table designs known for it.
///
/// Opening a session introspects every user table into the
/// [`registry`](Self::registry). Edits go through
/// [`registry_mut`](Self::registry_mut) and reach the database only when a
/// table is [`apply`](Self::apply)'d.
///
/// # Examples
///
/// ```
/// use table_designer_core::{ColumnDraft, ColumnType};
/// use table_designer_sqlite::{ApplyOutcome, Designer};
///
/// let mut designer = Designer::open_in_memory().unwrap();
/// designer.registry_mut().add_table("tags").unwrap();
/// designer
///     .registry_mut()
///     .add_column("tags", ColumnDraft::new("tag_id", ColumnType::Integer).primary_key())
///     .unwrap();
///
/// assert_eq!(designer.apply("tags").unwrap(), ApplyOutcome::Created);
/// designer.refresh().unwrap();
/// assert_eq!(designer.registry().table_names(), vec!["tags"]);
/// ```
pub struct Designer {
    conn: Connection,
    registry: SchemaRegistry,
}

impl Designer {
    /// Opens `path`, creating the database file if it does not exist.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "opened database");
        Self::from_connection(conn)
    }

    /// Opens an existing database file.
    ///
    /// # Errors
    ///
    /// Returns [`DesignerError::DatabaseError`] if the file does not exist
    /// or is not a database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path.as_ref(), flags)?;
        info!(path = %path.as_ref().display(), "opened database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wraps an existing connection, enabling foreign-key enforcement and
    /// introspecting its tables.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let registry = introspect_all(&conn)?;
        Ok(Self { conn, registry })
    }

    /// Re-reads every table from the database.
    ///
    /// Unapplied edits are discarded. If introspection fails the current
    /// registry is kept.
    pub fn refresh(&mut self) -> Result<()> {
        reload(&mut self.registry, &self.conn)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.registry
    }

    /// The `CREATE TABLE` statement [`apply`](Self::apply) would use.
    pub fn sql_preview(&self, table: &str) -> Result<String> {
        self.registry
            .get(table)
            .map(create_table_sql)
            .ok_or_else(|| DesignerError::TableNotFound(table.to_string()))
    }

    /// Creates or rebuilds `table` in the database from its design.
    pub fn apply(&mut self, table: &str) -> Result<ApplyOutcome> {
        let spec = self
            .registry
            .get(table)
            .ok_or_else(|| DesignerError::TableNotFound(table.to_string()))?;
        apply_table(&self.conn, spec)
    }

    /// Applies every table in registry order, stopping at the first failure.
    /// Tables applied before the failure stay applied.
    pub fn apply_all(&mut self) -> Result<Vec<(String, ApplyOutcome)>> {
        let mut outcomes = Vec::with_capacity(self.registry.len());
        for spec in self.registry.tables() {
            let outcome = apply_table(&self.conn, spec)?;
            outcomes.push((spec.name().to_string(), outcome));
        }
        Ok(outcomes)
    }

    /// Merges the tables of `design` into the registry. Nothing is applied.
    pub fn import(&mut self, design: &DesignFile) -> Result<()> {
        design.import_into(&mut self.registry)?;
        info!(tables = design.tables.len(), "imported design");
        Ok(())
    }

    pub fn export(&self) -> DesignFile {
        DesignFile::from_registry(&self.registry)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

fn reload(registry: &mut SchemaRegistry, catalog: &dyn Catalog) -> Result<()> {
    *registry = introspect_all(catalog)?;
    Ok(())
}
