//! `CREATE TABLE` synthesis and the statements used to rebuild a table.
//!
//! [`create_table_sql`] is a deterministic function of a [`TableSpec`]:
//! one line per column in declaration order, then at most one
//! `PRIMARY KEY` clause, then one `FOREIGN KEY` clause per referencing
//! column. Lines are joined with `,\n` and the statement ends with `\n);`.
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
//! assert_eq!(
//!     create_table_sql(registry.get("T").unwrap()),
//!     "CREATE TABLE \"T\" (\n    \"id\" INTEGER,\n    \"name\" VCHAR(20) NOT NULL,\n    PRIMARY KEY(\"id\" AUTOINCREMENT)\n);"
//! );
//! ```

use crate::{ColumnSpec, TableSpec};

const INDENT: &str = "    ";

/// Quotes an identifier with double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal with single quotes, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Generates the `CREATE TABLE` statement for a table under its own name.
pub fn create_table_sql(table: &TableSpec) -> String {
    create_table_sql_named(table, table.name())
}

/// Generates the `CREATE TABLE` statement for a table's columns under
/// another name, e.g. the temporary table of a rebuild.
pub fn create_table_sql_named(table: &TableSpec, name: &str) -> String {
    let mut lines: Vec<String> = table.columns().iter().map(column_definition).collect();

    match table.primary_key_columns().as_slice() {
        [] => {}
        [single] => {
            let autoincrement = if single.auto_increment() && single.column_type().is_integer() {
                " AUTOINCREMENT"
            } else {
                ""
            };
            lines.push(format!(
                "{INDENT}PRIMARY KEY({}{autoincrement})",
                quote_identifier(single.name())
            ));
        }
        composite => {
            let names: Vec<String> = composite
                .iter()
                .map(|column| quote_identifier(column.name()))
                .collect();
            lines.push(format!("{INDENT}PRIMARY KEY({})", names.join(", ")));
        }
    }

    for column in table.columns() {
        let Some(fk) = column.foreign_key() else {
            continue;
        };
        let mut clause = format!(
            "{INDENT}FOREIGN KEY ({}) REFERENCES {}({})",
            quote_identifier(column.name()),
            quote_identifier(&fk.table),
            quote_identifier(&fk.column)
        );
        if !fk.on_delete.is_no_action() {
            clause.push_str(" ON DELETE ");
            clause.push_str(fk.on_delete.as_sql());
        }
        if !fk.on_update.is_no_action() {
            clause.push_str(" ON UPDATE ");
            clause.push_str(fk.on_update.as_sql());
        }
        lines.push(clause);
    }

    format!(
        "CREATE TABLE {} (\n{}\n);",
        quote_identifier(name),
        lines.join(",\n")
    )
}

/// One column line. `NOT NULL` and `UNIQUE` are implied for primary-key
/// columns and left out.
fn column_definition(column: &ColumnSpec) -> String {
    let mut line = format!("{INDENT}{}", quote_identifier(column.name()));
    let effective_type = column.column_type().effective_type();
    if !effective_type.is_empty() {
        line.push(' ');
        line.push_str(&effective_type);
    }
    if column.not_null() && !column.primary_key() {
        line.push_str(" NOT NULL");
    }
    if column.unique() && !column.primary_key() {
        line.push_str(" UNIQUE");
    }
    if let Some(default) = column.default_value() {
        line.push_str(" DEFAULT ");
        line.push_str(&quote_literal(default));
    }
    if let Some(check) = column.check() {
        line.push_str(&format!(" CHECK({check})"));
    }
    line
}

/// `DROP TABLE "<name>";`
pub fn drop_table_sql(name: &str) -> String {
    format!("DROP TABLE {};", quote_identifier(name))
}

/// `ALTER TABLE "<from>" RENAME TO "<to>";`
pub fn rename_table_sql(from: &str, to: &str) -> String {
    format!(
        "ALTER TABLE {} RENAME TO {};",
        quote_identifier(from),
        quote_identifier(to)
    )
}

/// Copies the listed columns from one table into another.
pub fn copy_rows_sql(from: &str, to: &str, columns: &[&str]) -> String {
    let list = columns
        .iter()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({list}) SELECT {list} FROM {};",
        quote_identifier(to),
        quote_identifier(from)
    )
}
