//! Error types for table design operations against SQLite.
//!
//! Provides a unified error type covering database access, catalog
//! conversion, design validation, table rebuilds, and design-file I/O.

use table_designer_core::ValidationError;
use thiserror::Error;

/// Errors that can occur while introspecting or applying table designs.
#[derive(Debug, Error)]
pub enum DesignerError {
    /// SQLite statement failure; carries the backend's message.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Design rejected before any statement ran.
    #[error("validation error: {0}")]
    ValidationError(#[from] ValidationError),

    /// Reading a table's metadata failed; the registry was not replaced.
    #[error("failed to introspect table '{table}': {source}")]
    IntrospectionError {
        table: String,
        #[source]
        source: Box<DesignerError>,
    },

    /// Catalog metadata could not be mapped onto the design model.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// A table rebuild could not be completed; nothing was committed.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Rows violate foreign keys after a rebuild; nothing was committed.
    #[error("foreign key check failed after rebuilding '{table}': {violations} violation(s)")]
    ForeignKeyViolation { table: String, violations: usize },

    /// Requested table is not known to the session.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`DesignerError`].
pub type Result<T> = std::result::Result<T, DesignerError>;
