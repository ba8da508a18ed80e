//! Table model, validation, and DDL synthesis for SQLite schema design.
//!
//! This crate is the pure half of the table designer: it owns the
//! in-memory description of tables being designed and turns it into
//! `CREATE TABLE` text. It performs no I/O.
//!
//! - [`ColumnSpec`] / [`TableSpec`]: a table under construction, columns in
//!   declaration order.
//! - [`ColumnDraft`]: editable column form state, validated into a
//!   [`ColumnSpec`].
//! - [`SchemaRegistry`]: every table known to a session, with the
//!   add/modify/remove/move operations and foreign-key eligibility.
//! - [`create_table_sql`]: deterministic DDL synthesis.
//! - [`validate_table`]: structural checks run before a table is applied.
//!
//! # Example
//!
//! ```
//! use table_designer_core::*;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.add_table("departments").unwrap();
//! registry
//!     .add_column("departments", ColumnDraft::new("dept_id", ColumnType::Integer).primary_key())
//!     .unwrap();
//!
//! registry.add_table("employees").unwrap();
//! registry
//!     .add_column("employees", ColumnDraft::new("id", ColumnType::Integer).primary_key().auto_increment())
//!     .unwrap();
//! assert!(registry.is_fk_eligible("dept_id", &ColumnType::Integer, "employees"));
//! registry
//!     .add_column(
//!         "employees",
//!         ColumnDraft::new("dept_id", ColumnType::Integer)
//!             .references("departments", "dept_id")
//!             .on_delete(ForeignKeyAction::Cascade),
//!     )
//!     .unwrap();
//!
//! let sql = create_table_sql(registry.get("employees").unwrap());
//! assert!(sql.contains(r#"FOREIGN KEY ("dept_id") REFERENCES "departments"("dept_id") ON DELETE CASCADE"#));
//! assert!(validate_table(registry.get("employees").unwrap()).is_empty());
//! ```

mod ddl;
mod draft;
mod registry;
mod types;
mod validate;

pub use ddl::{
    copy_rows_sql, create_table_sql, create_table_sql_named, drop_table_sql, quote_identifier,
    quote_literal, rename_table_sql,
};
pub use draft::ColumnDraft;
pub use registry::{FkTarget, Move, SchemaRegistry};
pub use types::*;
pub use validate::{ValidationError, validate_table};
