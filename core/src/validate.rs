//! Table and column validation.
//!
//! Catches structural problems in table designs before any statement is
//! executed: empty or duplicate names, lengths on types that take none,
//! `AUTOINCREMENT` outside an `INTEGER` primary key, and foreign keys that
//! do not target a sole primary-key column.
//!
//! # Examples
//!
//! ```
//! use table_designer_core::*;
//!
//! let mut table = TableSpec::new("t");
//! table.push_column(
//!     ColumnDraft::new("id", ColumnType::Integer).primary_key().build_from_catalog().unwrap(),
//! ).unwrap();
//! assert!(validate_table(&table).is_empty());
//!
//! // A table without columns cannot be created
//! let empty = TableSpec::new("t");
//! assert_eq!(validate_table(&empty), vec![ValidationError::EmptyTable("t".into())]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{ColumnSpec, ColumnType, TableSpec};

/// Design validation errors.
///
/// Raised before any statement executes; the registry is left untouched
/// whenever one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("table name cannot be empty")]
    EmptyTableName,
    #[error("table name already exists: {0}")]
    DuplicateTable(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("cannot save empty table: {0}")]
    EmptyTable(String),
    #[error("field name cannot be empty")]
    EmptyColumnName,
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },
    #[error("no column at index {index} in table '{table}'")]
    ColumnIndexOutOfRange { table: String, index: usize },
    /// A length was given for a type other than a sized text subtype.
    #[error("column '{column}' of type {column_type} cannot carry a length")]
    LengthNotAllowed { column: String, column_type: String },
    #[error("column '{0}' has a zero length")]
    ZeroLength(String),
    #[error("AUTOINCREMENT on column '{0}' requires an INTEGER primary key")]
    AutoIncrementRequiresIntegerPrimaryKey(String),
    /// A foreign key is missing its reference table or column.
    #[error("select reference table and column for foreign key on '{0}'")]
    IncompleteForeignKey(String),
    /// The referenced column is not the sole primary key of another table
    /// with the same name and type.
    #[error("column '{column}' cannot reference {table}({target})")]
    IneligibleForeignKey {
        column: String,
        table: String,
        target: String,
    },
    #[error("unknown foreign key action: {0}")]
    UnknownForeignKeyAction(String),
}

/// Validates a whole table definition.
///
/// Reports an empty table name, a table without columns, and every
/// column-level problem (empty or duplicate names, invalid lengths,
/// misplaced `AUTOINCREMENT`, incomplete foreign keys). Foreign-key
/// eligibility depends on the other tables and is checked by
/// [`SchemaRegistry`](crate::SchemaRegistry) instead.
pub fn validate_table(table: &TableSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if table.name.trim().is_empty() {
        errors.push(ValidationError::EmptyTableName);
        return errors;
    }
    if table.columns.is_empty() {
        errors.push(ValidationError::EmptyTable(table.name.clone()));
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for column in &table.columns {
        if !seen.insert(column.name.as_str()) {
            errors.push(ValidationError::DuplicateColumn {
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
        if let Err(err) = validate_column(column) {
            errors.push(err);
        }
    }

    errors
}

/// Checks the invariants of a single column.
pub(crate) fn validate_column(column: &ColumnSpec) -> Result<(), ValidationError> {
    if column.name.trim().is_empty() {
        return Err(ValidationError::EmptyColumnName);
    }
    validate_column_type(&column.name, &column.column_type)?;
    if column.auto_increment && !(column.primary_key && column.column_type.is_integer()) {
        return Err(ValidationError::AutoIncrementRequiresIntegerPrimaryKey(
            column.name.clone(),
        ));
    }
    if let Some(fk) = &column.foreign_key {
        if fk.table.trim().is_empty() || fk.column.trim().is_empty() {
            return Err(ValidationError::IncompleteForeignKey(column.name.clone()));
        }
    }
    Ok(())
}

fn validate_column_type(name: &str, column_type: &ColumnType) -> Result<(), ValidationError> {
    if let ColumnType::Text {
        subtype,
        length: Some(length),
    } = column_type
    {
        if !subtype.is_sized() {
            return Err(ValidationError::LengthNotAllowed {
                column: name.to_string(),
                column_type: subtype.as_str().to_string(),
            });
        }
        if *length == 0 {
            return Err(ValidationError::ZeroLength(name.to_string()));
        }
    }
    Ok(())
}
