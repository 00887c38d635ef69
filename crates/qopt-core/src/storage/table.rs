//! In-memory tables.

use std::collections::HashMap;

use tracing::debug;

use qopt_proto::{Column, DataType, Row, Schema, Value};

use crate::error::Error;

/// A named table: schema plus rows in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table. Columns are qualified with the table name.
    pub fn new(name: impl Into<String>, columns: &[(&str, DataType)]) -> Self {
        let name = name.into();
        let schema = Schema::new(
            columns
                .iter()
                .map(|(column, data_type)| Column::new(name.clone(), *column, *data_type))
                .collect(),
        );
        Self {
            name,
            schema,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row after checking arity and value types.
    pub fn insert(&mut self, row: Row) -> Result<(), Error> {
        if row.len() != self.schema.column_count() {
            return Err(Error::InvalidData(format!(
                "table {} has {} columns, row has {} values",
                self.name,
                self.schema.column_count(),
                row.len()
            )));
        }

        for (value, column) in row.values.iter().zip(&self.schema.columns) {
            if let Some(actual) = value.data_type() {
                if column.data_type != DataType::Any && actual != column.data_type {
                    return Err(Error::InvalidData(format!(
                        "column {} expects {}, got {}",
                        column.full_name(),
                        column.data_type,
                        actual
                    )));
                }
            }
        }

        self.rows.push(row);
        Ok(())
    }
}

/// Tables keyed by name. Read-only while plans execute.
#[derive(Debug, Default)]
pub struct TableManager {
    tables: HashMap<String, Table>,
}

impl TableManager {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new empty table.
    pub fn create_table(&mut self, name: &str, columns: &[(&str, DataType)]) -> Result<(), Error> {
        if self.tables.contains_key(name) {
            return Err(Error::InvalidData(format!("table {} already exists", name)));
        }
        debug!(table = name, columns = columns.len(), "created table");
        self.tables.insert(name.to_string(), Table::new(name, columns));
        Ok(())
    }

    /// Register a table declared with type names (`"int"`, `"string"`).
    pub fn create_table_with_types(
        &mut self,
        name: &str,
        columns: &[(&str, &str)],
    ) -> Result<(), Error> {
        let typed = columns
            .iter()
            .map(|(column, type_name)| -> Result<_, Error> {
                Ok((*column, DataType::parse(type_name)?))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        self.create_table(name, &typed)
    }

    /// Append a row to `table`.
    pub fn insert(&mut self, table: &str, values: Vec<Value>) -> Result<(), Error> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?
            .insert(Row::new(values))
    }

    /// Look up a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Names of all tables, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
