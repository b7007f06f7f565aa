//! Column-oriented table with per-column attribute bags.
//!
//! Column storage is delegated to polars [`Column`]s. Each column carries the
//! attributes bound to it from the header when the table was assembled, and
//! one column may be held aside as the row index.

use crate::error::{NeadError, Result};
use crate::models::{ColumnAttributes, Scalar};
use polars::prelude::*;

/// One named column plus its attributes
#[derive(Debug, Clone)]
pub struct TableColumn {
    data: Column,
    attributes: ColumnAttributes,
}

impl TableColumn {
    pub fn new(data: Column) -> Self {
        Self {
            data,
            attributes: ColumnAttributes::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: ColumnAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn name(&self) -> &str {
        self.data.name().as_str()
    }

    pub fn data(&self) -> &Column {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    pub fn attributes(&self) -> &ColumnAttributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Scalar> {
        self.attributes.get(key)
    }

    /// First attribute present among `keys`, with the key that matched
    pub fn first_attribute<'a>(&'a self, keys: &'a [String]) -> Option<(&'a str, &'a Scalar)> {
        keys.iter()
            .find_map(|key| self.attributes.get(key).map(|value| (key.as_str(), value)))
    }

    pub fn is_numeric(&self) -> bool {
        is_numeric_dtype(self.data.dtype())
    }

    pub(crate) fn replace_data(&mut self, data: Column) {
        self.data = data;
    }
}

/// Integer and floating-point dtypes
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Ordered columns of equal length, plus an optional row index
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<TableColumn>,
    index: Option<TableColumn>,
}

impl Table {
    /// Build a table; every column must have the same length and a unique
    /// name
    pub fn new(columns: Vec<TableColumn>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let height = first.len();
            for (i, column) in columns.iter().enumerate() {
                if column.len() != height {
                    return Err(NeadError::Configuration {
                        message: format!(
                            "column '{}' has {} rows, expected {}",
                            column.name(),
                            column.len(),
                            height
                        ),
                    });
                }
                if columns[..i].iter().any(|c| c.name() == column.name()) {
                    return Err(NeadError::Configuration {
                        message: format!("column '{}' appears twice", column.name()),
                    });
                }
            }
        }
        Ok(Self {
            columns,
            index: None,
        })
    }

    /// Wrap a polars frame; columns start without attributes
    pub fn from_frame(frame: DataFrame) -> Self {
        Self {
            columns: frame
                .get_columns()
                .iter()
                .cloned()
                .map(TableColumn::new)
                .collect(),
            index: None,
        }
    }

    /// Export as a polars frame, index column first
    pub fn to_frame(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .index
            .iter()
            .chain(self.columns.iter())
            .map(|c| c.data.clone())
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    pub fn height(&self) -> usize {
        self.columns
            .first()
            .or(self.index.as_ref())
            .map_or(0, TableColumn::len)
    }

    /// Number of ordinary columns, the index excluded
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(TableColumn::name).collect()
    }

    pub fn index(&self) -> Option<&TableColumn> {
        self.index.as_ref()
    }

    /// Look a name up among the columns, then the index
    pub fn find(&self, name: &str) -> Option<&TableColumn> {
        self.column(name)
            .or_else(|| self.index.as_ref().filter(|c| c.name() == name))
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [TableColumn] {
        &mut self.columns
    }

    pub(crate) fn take_column(&mut self, position: usize) -> Result<TableColumn> {
        if position >= self.columns.len() {
            return Err(NeadError::IndexOutOfRange {
                position,
                count: self.columns.len(),
            });
        }
        Ok(self.columns.remove(position))
    }

    pub(crate) fn set_index(&mut self, column: TableColumn) {
        self.index = Some(column);
    }
}
