//! The set of tables known to a design session.
//!
//! [`SchemaRegistry`] owns every [`TableSpec`] of the session, either read
//! back from an opened database or defined by the user. All mutation goes
//! through its methods; each one validates first and leaves the registry
//! unchanged on error.
//!
//! # Example
//!
//! ```
//! use table_designer_core::*;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.add_table("T").unwrap();
//! registry
//!     .add_column("T", ColumnDraft::new("id", ColumnType::Integer).primary_key().auto_increment())
//!     .unwrap();
//! registry
//!     .add_column(
//!         "T",
//!         ColumnDraft::new("name", ColumnType::sized_text(TextSubtype::VChar, 20)).not_null(),
//!     )
//!     .unwrap();
//!
//! let sql = create_table_sql(registry.get("T").unwrap());
//! assert!(sql.contains(r#"PRIMARY KEY("id" AUTOINCREMENT)"#));
//! ```

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;
use crate::{ColumnDraft, ColumnSpec, ColumnType, TableSpec};

/// Direction for [`SchemaRegistry::move_column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Top,
    Up,
    Down,
    Bottom,
}

/// A table/column pair a foreign key may reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FkTarget {
    pub table: String,
    pub column: String,
}

/// Tables known to the current session, in the order they became known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    tables: Vec<TableSpec>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|table| table.name.as_str()).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSpec> {
        self.tables.iter()
    }

    /// Registers a new, empty table.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTableName`] for a blank name and
    /// [`ValidationError::DuplicateTable`] if the name is already known.
    pub fn add_table(&mut self, name: &str) -> Result<&TableSpec, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyTableName);
        }
        if self.contains(name) {
            return Err(ValidationError::DuplicateTable(name.to_string()));
        }
        self.tables.push(TableSpec::new(name));
        Ok(&self.tables[self.tables.len() - 1])
    }

    /// Inserts a complete table, replacing any table of the same name in
    /// place.
    pub fn insert_table(&mut self, table: TableSpec) {
        match self.tables.iter_mut().find(|existing| existing.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    /// Forgets a table. The database is not touched.
    pub fn remove_table(&mut self, name: &str) -> Result<TableSpec, ValidationError> {
        let index = self.index_of(name)?;
        Ok(self.tables.remove(index))
    }

    /// Appends a column built from `draft` to `table`.
    ///
    /// # Errors
    ///
    /// Returns the draft's validation error, or
    /// [`ValidationError::DuplicateColumn`] if the name is taken.
    pub fn add_column(&mut self, table: &str, draft: ColumnDraft) -> Result<&ColumnSpec, ValidationError> {
        let index = self.index_of(table)?;
        let column = draft.build(self, table)?;
        let spec = &mut self.tables[index];
        spec.push_column(column)?;
        Ok(&spec.columns[spec.columns.len() - 1])
    }

    /// Replaces the column at `position` with one built from `draft`.
    pub fn modify_column(
        &mut self,
        table: &str,
        position: usize,
        draft: ColumnDraft,
    ) -> Result<&ColumnSpec, ValidationError> {
        let index = self.index_of(table)?;
        let column = draft.build(self, table)?;
        let spec = &mut self.tables[index];
        spec.replace_column(position, column)?;
        Ok(&spec.columns[position])
    }

    pub fn remove_column(&mut self, table: &str, position: usize) -> Result<ColumnSpec, ValidationError> {
        let index = self.index_of(table)?;
        self.tables[index].remove_column(position)
    }

    /// Moves a column and returns its new position.
    pub fn move_column(&mut self, table: &str, position: usize, to: Move) -> Result<usize, ValidationError> {
        let index = self.index_of(table)?;
        let spec = &mut self.tables[index];
        let last = spec.columns.len().saturating_sub(1);
        let target = match to {
            Move::Top => 0,
            Move::Up => position.saturating_sub(1),
            Move::Down => (position + 1).min(last),
            Move::Bottom => last,
        };
        spec.move_column(position, target)?;
        Ok(target)
    }

    /// Lists the columns a candidate column may reference.
    ///
    /// A table qualifies when it is not `excluding_table`, its primary key
    /// consists of exactly one column, and that column has the candidate's
    /// name and the same effective type (`VCHAR(40)` does not match
    /// `VCHAR(50)`). Recompute whenever the candidate's name or type, or the
    /// set of tables, changes.
    ///
    /// # Examples
    ///
    /// ```
    /// use table_designer_core::*;
    ///
    /// let mut registry = SchemaRegistry::new();
    /// registry.add_table("a").unwrap();
    /// registry
    ///     .add_column("a", ColumnDraft::new("id", ColumnType::sized_text(TextSubtype::VChar, 20)).primary_key())
    ///     .unwrap();
    ///
    /// let same = ColumnType::sized_text(TextSubtype::VChar, 20);
    /// let shorter = ColumnType::sized_text(TextSubtype::VChar, 10);
    /// assert_eq!(registry.fk_targets("id", &same, "b").len(), 1);
    /// assert!(registry.fk_targets("id", &shorter, "b").is_empty());
    /// assert!(registry.fk_targets("id", &same, "a").is_empty());
    /// ```
    pub fn fk_targets(
        &self,
        candidate_name: &str,
        candidate_type: &ColumnType,
        excluding_table: &str,
    ) -> Vec<FkTarget> {
        let candidate_name = candidate_name.trim();
        if candidate_name.is_empty() {
            return Vec::new();
        }
        let candidate_type = candidate_type.effective_type();

        self.tables
            .iter()
            .filter(|table| table.name != excluding_table)
            .filter_map(|table| {
                let pk = table.sole_primary_key()?;
                (pk.name == candidate_name && pk.column_type.effective_type() == candidate_type)
                    .then(|| FkTarget {
                        table: table.name.clone(),
                        column: pk.name.clone(),
                    })
            })
            .collect()
    }

    pub fn is_fk_eligible(
        &self,
        candidate_name: &str,
        candidate_type: &ColumnType,
        excluding_table: &str,
    ) -> bool {
        !self
            .fk_targets(candidate_name, candidate_type, excluding_table)
            .is_empty()
    }

    /// Checks that `column`'s foreign key, if any, is one of the
    /// [`fk_targets`](Self::fk_targets) for a column of `table`.
    pub fn check_reference(&self, table: &str, column: &ColumnSpec) -> Result<(), ValidationError> {
        let Some(fk) = &column.foreign_key else {
            return Ok(());
        };
        let eligible = self
            .fk_targets(&column.name, &column.column_type, table)
            .iter()
            .any(|target| target.table == fk.table && target.column == fk.column);
        if eligible {
            Ok(())
        } else {
            Err(ValidationError::IneligibleForeignKey {
                column: column.name.clone(),
                table: fk.table.clone(),
                target: fk.column.clone(),
            })
        }
    }

    fn index_of(&self, name: &str) -> Result<usize, ValidationError> {
        self.tables
            .iter()
            .position(|table| table.name == name)
            .ok_or_else(|| ValidationError::UnknownTable(name.to_string()))
    }
}
