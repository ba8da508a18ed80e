//! Column drafts: the editable form state behind a [`ColumnSpec`].
//!
//! A [`ColumnDraft`] holds whatever a user has entered for a column so far.
//! Building it validates the entry and produces an immutable
//! [`ColumnSpec`]. Use [`ColumnDraft::build`] for columns entered by a user,
//! which also checks foreign-key eligibility against the registry, and
//! [`ColumnDraft::build_from_catalog`] for columns read back from a live
//! database, whose foreign keys are taken as recorded.

use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, validate_column};
use crate::{ColumnSpec, ColumnType, ForeignKey, ForeignKeyAction, SchemaRegistry};

/// Editable column definition.
///
/// # Examples
///
/// ```
/// use table_designer_core::*;
///
/// let mut registry = SchemaRegistry::new();
/// registry.add_table("departments").unwrap();
/// registry
///     .add_column("departments", ColumnDraft::new("dept_id", ColumnType::Integer).primary_key())
///     .unwrap();
/// registry.add_table("employees").unwrap();
///
/// let draft = ColumnDraft::new("dept_id", ColumnType::Integer)
///     .references("departments", "dept_id")
///     .on_delete(ForeignKeyAction::Cascade);
/// let column = draft.build(&registry, "employees").unwrap();
/// assert_eq!(column.foreign_key().unwrap().table, "departments");
///
/// // No table has a sole INTEGER primary key named `emp_id`
/// let bad = ColumnDraft::new("emp_id", ColumnType::Integer).references("departments", "dept_id");
/// assert!(bad.build(&registry, "employees").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDraft {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    /// Default literal. [`build`](Self::build) treats a blank entry as none;
    /// [`build_from_catalog`](Self::build_from_catalog) keeps it, so an
    /// empty-string default survives.
    pub default_value: Option<String>,
    /// `CHECK` expression; blank means none.
    pub check: String,
    pub foreign_key: Option<ForeignKey>,
}

impl ColumnDraft {
    /// Starts a draft with the given name and type and no constraints.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            ..Self::default()
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_check(mut self, expression: impl Into<String>) -> Self {
        self.check = expression.into();
        self
    }

    /// Points the column at `table(column)` with `NO ACTION` for both actions.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKey::new(table, column));
        self
    }

    /// Sets `ON DELETE`; has no effect without a reference.
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_delete = action;
        }
        self
    }

    /// Sets `ON UPDATE`; has no effect without a reference.
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        if let Some(fk) = self.foreign_key.as_mut() {
            fk.on_update = action;
        }
        self
    }

    /// Builds a column entered for `table`.
    ///
    /// Text inputs are trimmed and blank defaults or checks are dropped.
    /// A foreign key must point at one of the targets returned by
    /// [`SchemaRegistry::fk_targets`] for this column's name and type.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first invalid input.
    pub fn build(&self, registry: &SchemaRegistry, table: &str) -> Result<ColumnSpec, ValidationError> {
        let mut trimmed = self.clone();
        trimmed.name = self.name.trim().to_string();
        trimmed.default_value = self
            .default_value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        trimmed.check = self.check.trim().to_string();
        if let Some(fk) = trimmed.foreign_key.as_mut() {
            fk.table = fk.table.trim().to_string();
            fk.column = fk.column.trim().to_string();
        }

        let column = trimmed.build_from_catalog()?;
        registry.check_reference(table, &column)?;
        Ok(column)
    }

    /// Builds a column as recorded in a live catalog.
    ///
    /// Enforces the per-column invariants but takes the foreign key and the
    /// default as-is. `NOT NULL` and `UNIQUE` are cleared on primary-key
    /// columns, where the generated DDL leaves them implicit.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if a column invariant is violated.
    pub fn build_from_catalog(&self) -> Result<ColumnSpec, ValidationError> {
        let column = ColumnSpec {
            name: self.name.clone(),
            column_type: self.column_type.clone(),
            not_null: self.not_null && !self.primary_key,
            primary_key: self.primary_key,
            auto_increment: self.auto_increment,
            unique: self.unique && !self.primary_key,
            default_value: self.default_value.clone(),
            check: non_blank(&self.check),
            foreign_key: self.foreign_key.clone(),
        };
        validate_column(&column)?;
        Ok(column)
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
