//! SQLite side of the table designer.
//!
//! Reads live tables back into [`table_designer_core`] designs and applies
//! designs to a database, rebuilding existing tables without losing the data
//! in columns that survive the change.
//!
//! # Architecture
//!
//! - **`catalog`**: the [`Catalog`] trait and its `rusqlite` implementation
//!   over `sqlite_master` and the `pragma_*` table functions
//! - **`introspect`**: catalog rows to [`TableSpec`](table_designer_core::TableSpec)
//! - **`apply`**: create or rebuild a table inside one transaction
//! - **`session`**: [`Designer`], a connection plus its registry
//! - **`design_file`**: designs stored as YAML or JSON
//!
//! # Quick start
//!
//! ```
//! use table_designer_core::{ColumnDraft, ColumnType, TextSubtype};
//! use table_designer_sqlite::{ApplyOutcome, Designer};
//!
//! let mut designer = Designer::open_in_memory().unwrap();
//! let registry = designer.registry_mut();
//! registry.add_table("T").unwrap();
//! registry
//!     .add_column("T", ColumnDraft::new("id", ColumnType::Integer).primary_key().auto_increment())
//!     .unwrap();
//! registry
//!     .add_column("T", ColumnDraft::new("name", ColumnType::sized_text(TextSubtype::VChar, 20)).not_null())
//!     .unwrap();
//!
//! assert_eq!(designer.apply("T").unwrap(), ApplyOutcome::Created);
//!
//! // Reading the table back yields the same design.
//! let designed = designer.registry().get("T").unwrap().clone();
//! designer.refresh().unwrap();
//! assert_eq!(designer.registry().get("T").unwrap(), &designed);
//! ```
//!
//! # Rebuilds
//!
//! ```no_run
//! use table_designer_sqlite::{ApplyOutcome, Designer};
//!
//! let mut designer = Designer::open("app.db").unwrap();
//! designer.registry_mut().remove_column("users", 2).unwrap();
//! if let ApplyOutcome::Migrated { dropped, .. } = designer.apply("users").unwrap() {
//!     println!("dropped columns: {dropped:?}");
//! }
//! ```

mod apply;
mod catalog;
mod design_file;
mod error;
mod introspect;
mod session;

pub use apply::{ApplyOutcome, TEMP_TABLE_PREFIX, apply_table};
pub use catalog::{Catalog, ColumnRow, ForeignKeyRow, IndexColumnRow, IndexRow};
pub use design_file::{DESIGN_FILE_VERSION, DesignFile, DesignFormat};
pub use error::{DesignerError, Result};
pub use introspect::{introspect_all, introspect_table};
pub use session::Designer;
