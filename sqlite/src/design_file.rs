//! Design files: table designs stored as YAML or JSON.
//!
//! Foreign keys may point at any table in the file or already in the
//! registry, whatever the order. Exports list referenced tables first:
//!
//! ```yaml
//! version: "1.0"
//! tables:
//!   - name: departments
//!     columns:
//!       - { name: dept_id, type: INTEGER, primary_key: true, auto_increment: true }
//!       - { name: title, type: VCHAR(40), not_null: true }
//!   - name: employees
//!     columns:
//!       - { name: emp_id, type: INTEGER, primary_key: true }
//!       - name: dept_id
//!         type: INTEGER
//!         foreign_key: { table: departments, column: dept_id, on_delete: CASCADE }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use table_designer_core::{SchemaRegistry, TableSpec, validate_table};

use crate::error::Result;

/// Version written by [`DesignFile::new`].
pub const DESIGN_FILE_VERSION: &str = "1.0";

/// On-disk encoding, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignFormat {
    Yaml,
    Json,
}

impl DesignFormat {
    /// `.json` selects JSON; anything else (`.yml`, `.yaml`, no extension)
    /// is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// A set of table designs that can be saved, loaded, and imported into a
/// [`SchemaRegistry`].
///
/// # Examples
///
/// ```
/// use table_designer_sqlite::DesignFile;
///
/// let yaml = r#"
/// version: "1.0"
/// tables:
///   - name: tags
///     columns:
///       - { name: tag_id, type: INTEGER, primary_key: true }
///       - { name: label, type: VCHAR(20), unique: true }
/// "#;
/// let design: DesignFile = serde_yaml::from_str(yaml).unwrap();
/// let registry = design.to_registry().unwrap();
/// assert_eq!(registry.get("tags").unwrap().columns().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFile {
    pub version: String,
    #[serde(default)]
    pub tables: Vec<TableSpec>,
}

impl DesignFile {
    pub fn new(tables: Vec<TableSpec>) -> Self {
        Self {
            version: DESIGN_FILE_VERSION.to_string(),
            tables,
        }
    }

    /// Snapshot of every table in `registry`.
    ///
    /// Tables keep registry order except that a referenced table is moved
    /// ahead of the tables pointing at it. Tables caught in a reference
    /// cycle stay in registry order.
    pub fn from_registry(registry: &SchemaRegistry) -> Self {
        let mut pending: Vec<&TableSpec> = registry.tables().collect();
        let mut ordered: Vec<TableSpec> = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready = pending.iter().position(|table| {
                table.columns().iter().all(|column| match column.foreign_key() {
                    Some(fk) => {
                        fk.table == table.name()
                            || !pending.iter().any(|other| other.name() == fk.table)
                    }
                    None => true,
                })
            });
            let next = pending.remove(ready.unwrap_or(0));
            ordered.push(next.clone());
        }
        Self::new(ordered)
    }

    /// Loads a design file, YAML or JSON depending on the extension.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DesignerError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DesignerError::YamlError) /
    /// [`JsonError`](crate::DesignerError::JsonError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let design = match DesignFormat::from_path(path) {
            DesignFormat::Json => serde_json::from_reader(reader)?,
            DesignFormat::Yaml => serde_yaml::from_reader(reader)?,
        };
        Ok(design)
    }

    /// Saves the design file, YAML or JSON depending on the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        match DesignFormat::from_path(path) {
            DesignFormat::Json => serde_json::to_writer_pretty(writer, self)?,
            DesignFormat::Yaml => serde_yaml::to_writer(writer, self)?,
        }
        Ok(())
    }

    /// Builds a registry from the listed tables.
    ///
    /// # Errors
    ///
    /// See [`import_into`](Self::import_into).
    pub fn to_registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        self.import_into(&mut registry)?;
        Ok(registry)
    }

    /// Adds the listed tables to `registry`, replacing tables of the same
    /// name in place.
    ///
    /// Every table is validated and staged first; foreign keys are then
    /// checked against the fully staged registry, so a table may reference
    /// one listed after it. On error `registry` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`](table_designer_core::ValidationError)
    /// found, including [`IneligibleForeignKey`](table_designer_core::ValidationError::IneligibleForeignKey)
    /// for a reference to a table that is in neither the file nor `registry`.
    pub fn import_into(&self, registry: &mut SchemaRegistry) -> Result<()> {
        let mut staged = registry.clone();
        for table in &self.tables {
            if let Some(err) = validate_table(table).into_iter().next() {
                return Err(err.into());
            }
            let mut rebuilt = TableSpec::new(table.name());
            for column in table.columns() {
                rebuilt.push_column(column.to_draft().build_from_catalog()?)?;
            }
            staged.insert_table(rebuilt);
        }

        for table in &self.tables {
            for column in table.columns() {
                staged.check_reference(table.name(), column)?;
            }
        }
        *registry = staged;
        Ok(())
    }
}
