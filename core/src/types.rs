//! Column and table type definitions for schema design.
//!
//! This module defines the in-memory model of tables under construction.
//! A [`TableSpec`] is a name plus an ordered list of [`ColumnSpec`]s; column
//! order is declaration order and drives the emitted DDL. The types are
//! designed for serialization with [`serde`] so designs can round-trip
//! through JSON and YAML files.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Matches a sized text declaration such as `VCHAR(40)`.
static SIZED_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CHAR|VCHAR|NCHAR|NVCHAR)\s*\(\s*([1-9][0-9]*)\s*\)$")
        .expect("static regex must compile")
});

/// Storage class a column's values are kept in.
///
/// # Examples
///
/// ```
/// use table_designer_core::{ColumnType, StorageType};
///
/// assert_eq!(ColumnType::Boolean.storage_type(), StorageType::Integer);
/// assert_eq!(ColumnType::Date.storage_type(), StorageType::Text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Integer,
    Text,
    Real,
    Blob,
    Numeric,
}

impl StorageType {
    /// Returns the SQL keyword for this storage class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
        }
    }

    /// Derives the storage class of an arbitrary declared type using the
    /// SQLite column affinity rules.
    pub fn from_affinity(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display subtype of a `TEXT` column.
///
/// Only the sized subtypes (`CHAR`, `VCHAR`, `NCHAR`, `NVCHAR`) accept a
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextSubtype {
    #[default]
    Text,
    Char,
    VChar,
    NChar,
    NVChar,
}

impl TextSubtype {
    /// All subtypes in the order they are offered for selection.
    pub const ALL: [TextSubtype; 5] = [
        Self::Text,
        Self::Char,
        Self::VChar,
        Self::NChar,
        Self::NVChar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Char => "CHAR",
            Self::VChar => "VCHAR",
            Self::NChar => "NCHAR",
            Self::NVChar => "NVCHAR",
        }
    }

    /// Returns `true` for subtypes that may carry a length.
    pub fn is_sized(&self) -> bool {
        !matches!(self, Self::Text)
    }

    /// Parses a subtype keyword, ignoring ASCII case.
    pub fn parse(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|subtype| subtype.as_str().eq_ignore_ascii_case(keyword))
    }
}

/// Type selected for a column.
///
/// `Date` and `Boolean` are display aliases: they are emitted and stored as
/// `TEXT` and `INTEGER` respectively. `Declared` carries any other type name
/// found in a live catalog and is emitted verbatim.
///
/// The [`Display`](fmt::Display) form is the design form (`DATE`,
/// `VCHAR(20)`, ...) and parses back through [`ColumnType::parse_declared`];
/// [`effective_type`](ColumnType::effective_type) is the form written to DDL.
///
/// # Examples
///
/// ```
/// use table_designer_core::{ColumnType, TextSubtype};
///
/// let ty = ColumnType::parse_declared("VCHAR(40)");
/// assert_eq!(ty, ColumnType::sized_text(TextSubtype::VChar, 40));
/// assert_eq!(ty.effective_type(), "VCHAR(40)");
/// assert_eq!(ty.display_name(), "VCHAR");
///
/// assert_eq!(ColumnType::Date.effective_type(), "TEXT");
/// assert_eq!(ColumnType::Date.to_string(), "DATE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    #[default]
    Integer,
    Text {
        subtype: TextSubtype,
        length: Option<u32>,
    },
    Real,
    Blob,
    Numeric,
    Date,
    Boolean,
    Declared(String),
}

impl ColumnType {
    /// Plain `TEXT`.
    pub fn text() -> Self {
        Self::Text {
            subtype: TextSubtype::Text,
            length: None,
        }
    }

    /// A text subtype with a length, e.g. `VCHAR(20)`.
    pub fn sized_text(subtype: TextSubtype, length: u32) -> Self {
        Self::Text {
            subtype,
            length: Some(length),
        }
    }

    /// Maps a declared type from a live catalog onto the design model.
    ///
    /// `SUBTYPE(N)` for the sized text subtypes splits into subtype and
    /// length, the known keywords map to their variants (ignoring case),
    /// and anything else is kept verbatim as [`ColumnType::Declared`].
    pub fn parse_declared(declared: &str) -> Self {
        let trimmed = declared.trim();
        if let Some(caps) = SIZED_TEXT_RE.captures(trimmed) {
            if let (Some(subtype), Ok(length)) =
                (TextSubtype::parse(&caps[1]), caps[2].parse::<u32>())
            {
                return Self::sized_text(subtype, length);
            }
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "INTEGER" => Self::Integer,
            "REAL" => Self::Real,
            "BLOB" => Self::Blob,
            "NUMERIC" => Self::Numeric,
            "DATE" => Self::Date,
            "BOOLEAN" => Self::Boolean,
            keyword => match TextSubtype::parse(keyword) {
                Some(subtype) => Self::Text {
                    subtype,
                    length: None,
                },
                None => Self::Declared(trimmed.to_string()),
            },
        }
    }

    /// Type string written to DDL and compared for foreign-key eligibility.
    pub fn effective_type(&self) -> String {
        match self {
            Self::Date => "TEXT".to_string(),
            Self::Boolean => "INTEGER".to_string(),
            other => other.to_string(),
        }
    }

    /// Label shown for the type, without any length.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text { subtype, .. } => subtype.as_str(),
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
            Self::Declared(name) => name,
        }
    }

    pub fn length(&self) -> Option<u32> {
        match self {
            Self::Text { length, .. } => *length,
            _ => None,
        }
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::Integer | Self::Boolean => StorageType::Integer,
            Self::Text { .. } | Self::Date => StorageType::Text,
            Self::Real => StorageType::Real,
            Self::Blob => StorageType::Blob,
            Self::Numeric => StorageType::Numeric,
            Self::Declared(name) => StorageType::from_affinity(name),
        }
    }

    /// Returns `true` when the effective type is exactly `INTEGER`, the only
    /// type that may carry `AUTOINCREMENT`.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer | Self::Boolean)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text {
                subtype,
                length: Some(length),
            } if subtype.is_sized() => write!(f, "{}({length})", subtype.as_str()),
            other => f.write_str(other.display_name()),
        }
    }
}

impl FromStr for ColumnType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_declared(s))
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        Self::parse_declared(&value)
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForeignKeyAction {
    #[default]
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    #[serde(rename = "RESTRICT")]
    Restrict,
}

impl ForeignKeyAction {
    pub const ALL: [ForeignKeyAction; 5] = [
        Self::NoAction,
        Self::Cascade,
        Self::SetNull,
        Self::SetDefault,
        Self::Restrict,
    ];

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Restrict => "RESTRICT",
        }
    }

    pub fn is_no_action(&self) -> bool {
        matches!(self, Self::NoAction)
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ForeignKeyAction {
    type Err = ValidationError;

    /// Parses an action keyword. Case and inner whitespace are normalized,
    /// and an empty string reads as `NO ACTION`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Ok(Self::NoAction);
        }
        Self::ALL
            .into_iter()
            .find(|action| action.as_sql().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ValidationError::UnknownForeignKeyAction(s.to_string()))
    }
}

/// Foreign-key reference from a column to another table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Referenced column (the target table's sole primary-key column).
    pub column: String,
    #[serde(default, skip_serializing_if = "ForeignKeyAction::is_no_action")]
    pub on_delete: ForeignKeyAction,
    #[serde(default, skip_serializing_if = "ForeignKeyAction::is_no_action")]
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    /// Creates a reference with `NO ACTION` for both actions.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One declared column of a table under construction.
///
/// Fields are read through accessors. Instances are produced by
/// [`ColumnDraft`](crate::ColumnDraft), which enforces the column
/// invariants (non-empty name, lengths only on sized text subtypes,
/// `AUTOINCREMENT` only on an `INTEGER` primary key).
///
/// # Examples
///
/// ```
/// use table_designer_core::{ColumnDraft, ColumnType};
///
/// let column = ColumnDraft::new("id", ColumnType::Integer)
///     .primary_key()
///     .auto_increment()
///     .build_from_catalog()
///     .unwrap();
/// assert!(column.primary_key());
/// assert!(column.auto_increment());
/// assert_eq!(column.column_type().effective_type(), "INTEGER");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) column_type: ColumnType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) not_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) auto_increment: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(crate) unique: bool,
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub(crate) default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) foreign_key: Option<ForeignKey>,
}

impl ColumnSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn not_null(&self) -> bool {
        self.not_null
    }

    pub fn primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    /// Default literal, unquoted.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Raw `CHECK` expression, without the surrounding `CHECK(...)`.
    pub fn check(&self) -> Option<&str> {
        self.check.as_deref()
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.foreign_key.as_ref()
    }

    /// Returns a draft pre-filled with this column, for editing.
    pub fn to_draft(&self) -> crate::ColumnDraft {
        crate::ColumnDraft {
            name: self.name.clone(),
            column_type: self.column_type.clone(),
            not_null: self.not_null,
            primary_key: self.primary_key,
            auto_increment: self.auto_increment,
            unique: self.unique,
            default_value: self.default_value.clone(),
            check: self.check.clone().unwrap_or_default(),
            foreign_key: self.foreign_key.clone(),
        }
    }
}

/// A table under construction: a name and its columns in declaration order.
///
/// # Examples
///
/// ```
/// use table_designer_core::{ColumnDraft, ColumnType, TableSpec, TextSubtype};
///
/// let mut table = TableSpec::new("users");
/// table.push_column(
///     ColumnDraft::new("id", ColumnType::Integer).primary_key().build_from_catalog().unwrap(),
/// ).unwrap();
/// table.push_column(
///     ColumnDraft::new("email", ColumnType::sized_text(TextSubtype::VChar, 80))
///         .unique()
///         .build_from_catalog()
///         .unwrap(),
/// ).unwrap();
///
/// assert_eq!(table.column_names(), vec!["id", "email"]);
/// assert_eq!(table.primary_key_columns().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Creates an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Primary-key columns in declaration order.
    pub fn primary_key_columns(&self) -> Vec<&ColumnSpec> {
        self.columns.iter().filter(|column| column.primary_key).collect()
    }

    /// Returns the primary-key column when the key consists of exactly one
    /// column.
    pub fn sole_primary_key(&self) -> Option<&ColumnSpec> {
        match self.primary_key_columns().as_slice() {
            [single] => Some(*single),
            _ => None,
        }
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateColumn`] if a column with the same
    /// name already exists.
    pub fn push_column(&mut self, column: ColumnSpec) -> Result<(), ValidationError> {
        self.ensure_unique_name(&column.name, None)?;
        self.columns.push(column);
        Ok(())
    }

    pub(crate) fn replace_column(
        &mut self,
        index: usize,
        column: ColumnSpec,
    ) -> Result<(), ValidationError> {
        self.ensure_index(index)?;
        self.ensure_unique_name(&column.name, Some(index))?;
        self.columns[index] = column;
        Ok(())
    }

    pub(crate) fn remove_column(&mut self, index: usize) -> Result<ColumnSpec, ValidationError> {
        self.ensure_index(index)?;
        Ok(self.columns.remove(index))
    }

    pub(crate) fn move_column(&mut self, index: usize, to: usize) -> Result<(), ValidationError> {
        self.ensure_index(index)?;
        let column = self.columns.remove(index);
        self.columns.insert(to.min(self.columns.len()), column);
        Ok(())
    }

    fn ensure_index(&self, index: usize) -> Result<(), ValidationError> {
        if index >= self.columns.len() {
            return Err(ValidationError::ColumnIndexOutOfRange {
                table: self.name.clone(),
                index,
            });
        }
        Ok(())
    }

    fn ensure_unique_name(&self, name: &str, skip: Option<usize>) -> Result<(), ValidationError> {
        let clash = self
            .columns
            .iter()
            .enumerate()
            .any(|(i, column)| Some(i) != skip && column.name == name);
        if clash {
            return Err(ValidationError::DuplicateColumn {
                table: self.name.clone(),
                column: name.to_string(),
            });
        }
        Ok(())
    }
}
