//! Column-oriented in-memory table shared by every pipeline stage.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s of equal
//! length. Cells are `Option<Value>`; `None` marks a missing value. Stages
//! never mutate a table they were handed; they build a new one.

use std::collections::HashSet;

use thiserror::Error;

use crate::data::{ColumnType, Value};

pub type Cell = Option<Value>;

/// Structural and conversion failures raised while reshaping a table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Column '{column}' is declared but not present in the table")]
    MissingColumn { column: String },
    #[error("Row {row} column '{column}': cannot convert '{value}' to {target}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
        target: ColumnType,
    },
    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column '{column}' has {found} value(s) but the table has {expected} row(s)")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != row_count {
                return Err(TableError::RaggedColumn {
                    column: column.name.clone(),
                    expected: row_count,
                    found: column.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Builds a raw table from decoded text records; empty fields become `None`.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Result<Self, TableError> {
        let mut columns = headers
            .iter()
            .map(|name| Column::new(name.clone(), Vec::with_capacity(records.len())))
            .collect::<Vec<_>>();
        for record in records {
            for (idx, column) in columns.iter_mut().enumerate() {
                let cell = record
                    .get(idx)
                    .filter(|value| !value.is_empty())
                    .map(|value| Value::String(value.clone()));
                column.cells.push(cell);
            }
        }
        Self::new(columns)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn row(&self, index: usize) -> Option<Vec<Option<&Value>>> {
        if index >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|column| column.cells[index].as_ref())
                .collect(),
        )
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Option<&Value>>> + '_ {
        (0..self.row_count).map(|idx| {
            self.columns
                .iter()
                .map(|column| column.cells[idx].as_ref())
                .collect()
        })
    }

    /// Returns a copy of the table without the named column.
    pub fn drop_column(&self, name: &str) -> Result<Table, TableError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))?;
        let mut columns = self.columns.clone();
        columns.remove(index);
        Ok(Table {
            columns,
            row_count: self.row_count,
        })
    }

    /// Returns a copy of the table with `column` inserted at `position`.
    pub fn insert_column(&self, position: usize, column: Column) -> Result<Table, TableError> {
        if !self.columns.is_empty() && column.len() != self.row_count {
            return Err(TableError::RaggedColumn {
                column: column.name,
                expected: self.row_count,
                found: column.cells.len(),
            });
        }
        let mut columns = self.columns.clone();
        columns.insert(position.min(columns.len()), column);
        Table::new(columns)
    }

    /// Extends this table with the rows of `other`, matching columns by name.
    pub fn append_rows(&mut self, other: &Table) -> Result<(), TableError> {
        if let Some(name) = self.layout_mismatch(other) {
            return Err(TableError::ColumnNotFound(name));
        }
        for column in &mut self.columns {
            if let Some(incoming) = other.column(&column.name) {
                column.cells.extend(incoming.cells.iter().cloned());
            }
        }
        self.row_count += other.row_count;
        Ok(())
    }

    fn layout_mismatch(&self, other: &Table) -> Option<String> {
        other
            .columns
            .iter()
            .find(|column| self.column(&column.name).is_none())
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|column| other.column(&column.name).is_none())
            })
            .map(|column| column.name.clone())
    }

    pub fn display_rows(&self, limit: usize) -> Vec<Vec<String>> {
        self.rows()
            .take(limit)
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}
