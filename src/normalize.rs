//! Column-name canonicalization and surrogate key injection.
//!
//! [`canonical_name()`] rewrites camelCase and PascalCase headers to
//! snake_case with two regex passes:
//!
//! 1. `(.)([A-Z][a-z]+)` → `$1_$2` splits before each capitalized word.
//! 2. `([a-z0-9])([A-Z])` → `$1_$2` splits acronym and digit boundaries.
//!
//! The result is then lower-cased. Anything else in the name (spaces,
//! punctuation, existing underscores) is preserved, so the CSV index artifact
//! `Unnamed: 0` canonicalizes to `unnamed: 0`.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::{
    data::Value,
    frame::{Column, Table, TableError},
};

/// Index column reintroduced when a frame is round-tripped through CSV.
pub const INDEX_ARTIFACT_COLUMN: &str = "unnamed: 0";
pub const SURROGATE_KEY_COLUMN: &str = "id";

static WORD_BOUNDARY: OnceLock<Regex> = OnceLock::new();
static CASE_BOUNDARY: OnceLock<Regex> = OnceLock::new();

fn word_boundary() -> &'static Regex {
    WORD_BOUNDARY.get_or_init(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid word regex"))
}

fn case_boundary() -> &'static Regex {
    CASE_BOUNDARY.get_or_init(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid case regex"))
}

pub fn canonical_name(name: &str) -> String {
    let split_words = word_boundary().replace_all(name, "${1}_${2}");
    let split_cases = case_boundary().replace_all(&split_words, "${1}_${2}");
    split_cases.to_lowercase()
}

pub fn normalize(table: &Table) -> Result<Table, TableError> {
    let mut columns = Vec::with_capacity(table.column_count() + 1);
    for column in table.columns() {
        let name = canonical_name(&column.name);
        if name != column.name {
            debug!("Renamed column '{}' -> '{}'", column.name, name);
        }
        columns.push(Column::new(name, column.cells.clone()));
    }
    let row_count = table.row_count();

    let renamed = Table::new(columns)?;
    let trimmed = match renamed.drop_column(INDEX_ARTIFACT_COLUMN) {
        Ok(table) => {
            debug!("Dropped index artifact column '{INDEX_ARTIFACT_COLUMN}'");
            table
        }
        Err(TableError::ColumnNotFound(_)) => renamed,
        Err(other) => return Err(other),
    };

    if trimmed.column(SURROGATE_KEY_COLUMN).is_some() {
        return Err(TableError::DuplicateColumn(SURROGATE_KEY_COLUMN.to_string()));
    }
    trimmed.insert_column(0, surrogate_key(row_count))
}

fn surrogate_key(row_count: usize) -> Column {
    let cells = (1..=row_count as i64)
        .map(|position| Some(Value::Integer(position)))
        .collect();
    Column::new(SURROGATE_KEY_COLUMN, cells)
}
