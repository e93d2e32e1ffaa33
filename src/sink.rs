//! Persistence boundary for validated tables.
//!
//! A [`Sink`] receives a finished table together with a [`SinkTarget`]
//! (table name and [`ConflictPolicy`]) and reports how many rows it wrote.
//! [`SqliteSink`] writes to a SQLite database inside a single transaction, so
//! a write either lands completely or not at all. [`MemorySink`] keeps tables
//! in memory for dry runs and tests.

use std::{collections::BTreeMap, fmt, path::Path};

use clap::ValueEnum;
use log::{debug, info};
use rusqlite::{
    Connection, params_from_iter,
    types::{ToSql, ToSqlOutput},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    data::{ColumnType, Value},
    frame::{Table, TableError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Drop any existing table and recreate it
    #[default]
    Replace,
    /// Keep existing rows and insert after them
    Append,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Replace => f.write_str("replace"),
            ConflictPolicy::Append => f.write_str("append"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkTarget {
    pub table: String,
    pub policy: ConflictPolicy,
}

impl SinkTarget {
    pub fn new(table: impl Into<String>, policy: ConflictPolicy) -> Self {
        Self {
            table: table.into(),
            policy,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Invalid sink table name '{0}'")]
    InvalidTableName(String),
    #[error("Cannot append to '{table}': {source}")]
    Layout {
        table: String,
        #[source]
        source: TableError,
    },
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub trait Sink {
    fn write(&mut self, table: &Table, target: &SinkTarget) -> Result<usize, SinkError>;
}

fn check_table_name(name: &str) -> Result<(), SinkError> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(SinkError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Table>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

impl Sink for MemorySink {
    fn write(&mut self, table: &Table, target: &SinkTarget) -> Result<usize, SinkError> {
        check_table_name(&target.table)?;
        match (target.policy, self.tables.get_mut(&target.table)) {
            (ConflictPolicy::Append, Some(existing)) => {
                existing
                    .append_rows(table)
                    .map_err(|source| SinkError::Layout {
                        table: target.table.clone(),
                        source,
                    })?;
            }
            _ => {
                self.tables.insert(target.table.clone(), table.clone());
            }
        }
        Ok(table.row_count())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::String(s) => ToSqlOutput::from(s.as_str()),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Float(f) => ToSqlOutput::from(*f),
            Value::Boolean(b) => ToSqlOutput::from(*b),
        })
    }
}

pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        debug!("Opening SQLite sink at {path:?}");
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Sink for SqliteSink {
    fn write(&mut self, table: &Table, target: &SinkTarget) -> Result<usize, SinkError> {
        check_table_name(&target.table)?;
        let name = quote_identifier(&target.table);
        let definition = column_definitions(table);

        let tx = self.conn.transaction()?;
        match target.policy {
            ConflictPolicy::Replace => {
                tx.execute(&format!("DROP TABLE IF EXISTS {name}"), [])?;
                tx.execute(&format!("CREATE TABLE {name} ({definition})"), [])?;
            }
            ConflictPolicy::Append => {
                let existing = existing_columns(&tx, &name)?;
                if existing.is_empty() {
                    tx.execute(&format!("CREATE TABLE {name} ({definition})"), [])?;
                } else if let Some(column) = column_set_mismatch(&existing, &table.column_names()) {
                    return Err(SinkError::Layout {
                        table: target.table.clone(),
                        source: TableError::ColumnNotFound(column),
                    });
                }
            }
        }

        let mut written = 0usize;
        if table.column_count() > 0 {
            let columns = table
                .column_names()
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=table.column_count())
                .map(|idx| format!("?{idx}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut statement =
                tx.prepare(&format!("INSERT INTO {name} ({columns}) VALUES ({placeholders})"))?;
            for row in table.rows() {
                written += statement.execute(params_from_iter(row))?;
            }
        }
        tx.commit()?;

        info!(
            "Wrote {written} row(s) to '{}' ({})",
            target.table, target.policy
        );
        Ok(written)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column names of an existing table; empty when the table does not exist.
fn existing_columns(conn: &Connection, quoted_name: &str) -> Result<Vec<String>, SinkError> {
    let mut statement = conn.prepare(&format!("PRAGMA table_info({quoted_name})"))?;
    let columns = statement
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn column_set_mismatch(existing: &[String], incoming: &[&str]) -> Option<String> {
    incoming
        .iter()
        .find(|name| !existing.iter().any(|column| column.as_str() == **name))
        .map(|name| name.to_string())
        .or_else(|| {
            existing
                .iter()
                .find(|column| !incoming.contains(&column.as_str()))
                .cloned()
        })
}

fn sql_type(column_type: Option<ColumnType>) -> &'static str {
    match column_type {
        Some(ColumnType::Integer) | Some(ColumnType::Boolean) => "INTEGER",
        Some(ColumnType::Float) => "REAL",
        Some(ColumnType::String) | None => "TEXT",
    }
}

fn column_definitions(table: &Table) -> String {
    table
        .columns()
        .iter()
        .map(|column| {
            let observed = column.cells.iter().flatten().next().map(Value::column_type);
            format!("{} {}", quote_identifier(&column.name), sql_type(observed))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
