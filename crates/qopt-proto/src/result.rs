//! Schema, row, and result set types.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::value::{DataType, Value};

/// A column of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Column {
    /// Owning table, if known.
    pub table_name: Option<String>,
    /// Alias the owning table was scanned under.
    #[serde(default)]
    pub table_alias: Option<String>,
    /// Column name.
    pub column_name: String,
    /// Declared type.
    pub data_type: DataType,
}

impl Column {
    /// Create a column owned by `table`.
    pub fn new(table: impl Into<String>, column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table_name: Some(table.into()),
            table_alias: None,
            column_name: column.into(),
            data_type,
        }
    }

    /// Create a column with no table qualifier.
    pub fn unqualified(column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table_name: None,
            table_alias: None,
            column_name: column.into(),
            data_type,
        }
    }

    /// Record the alias the owning table is known by.
    pub fn with_table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = Some(alias.into());
        self
    }

    /// `table.column`, or the bare column name when there is no table.
    pub fn full_name(&self) -> String {
        match &self.table_name {
            Some(table) => format!("{}.{}", table, self.column_name),
            None => self.column_name.clone(),
        }
    }

    /// Whether `name` (bare or `qualifier.column`) refers to this column. The
    /// qualifier may be the table name or its alias.
    pub fn matches(&self, name: &str) -> bool {
        match name.split_once('.') {
            Some((qualifier, column)) => self.column_name == column && self.is_qualified_by(qualifier),
            None => self.column_name == name,
        }
    }

    /// Whether `qualifier` names this column's table or table alias.
    pub fn is_qualified_by(&self, qualifier: &str) -> bool {
        self.table_name.as_deref() == Some(qualifier) || self.table_alias.as_deref() == Some(qualifier)
    }
}

/// Ordered list of columns; position matches row value order.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct Schema {
    /// Columns in positional order.
    pub columns: Vec<Column>,
}

impl Schema {
    /// Create a schema from columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Append a column.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column at `index`.
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Position of the first column matching `name`.
    ///
    /// A qualified `table.column` only matches columns of that table (by name
    /// or alias); a bare name matches the first column with that column name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.matches(name))
    }

    /// Left columns followed by right columns.
    pub fn concat(left: &Schema, right: &Schema) -> Schema {
        let mut columns = Vec::with_capacity(left.columns.len() + right.columns.len());
        columns.extend(left.columns.iter().cloned());
        columns.extend(right.columns.iter().cloned());
        Schema { columns }
    }
}

/// A row of values aligned with a schema.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Row {
    /// Values in schema order.
    pub values: Vec<Value>,
}

impl Row {
    /// Create a row.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Integer at `index`, `None` if absent or not an integer.
    pub fn get_int(&self, index: usize) -> Option<i64> {
        self.values.get(index).and_then(Value::as_int)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Left values followed by right values.
    pub fn concat(left: &Row, right: &Row) -> Row {
        let mut values = Vec::with_capacity(left.values.len() + right.values.len());
        values.extend(left.values.iter().cloned());
        values.extend(right.values.iter().cloned());
        Row { values }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

/// Materialized output of an operator.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub struct ResultSet {
    /// Output schema.
    pub schema: Schema,
    /// Rows in output order.
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Create an empty result set.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Create a result set with rows.
    pub fn with_rows(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    /// Append a row.
    pub fn add_row(&mut self, row: Row) {
        self.rows.push(row);
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

    /// Check if this result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of the column called `name`, in row order.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.schema.index_of(name)?;
        Some(self.rows.iter().filter_map(|r| r.get(index)).collect())
    }
}
