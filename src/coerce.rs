use std::fmt;

use log::{debug, warn};

use crate::{
    data::convert_value,
    frame::{Column, Table, TableError},
    type_map::{TypeDecl, TypeMap},
};

/// Non-fatal findings recorded while coercing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionWarning {
    UnknownTypeTag { column: String, tag: String },
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionWarning::UnknownTypeTag { column, tag } => write!(
                f,
                "Column '{column}' declares unrecognized type '{tag}'; left unchanged"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub table: Table,
    pub warnings: Vec<CoercionWarning>,
}

pub fn coerce(table: &Table, type_map: &TypeMap) -> Result<Coerced, TableError> {
    if let Some(missing) = type_map
        .columns()
        .find(|column| table.column(column).is_none())
    {
        return Err(TableError::MissingColumn {
            column: missing.to_string(),
        });
    }

    let mut warnings = Vec::new();
    let mut columns = Vec::with_capacity(table.column_count());
    for column in table.columns() {
        let coerced = match type_map.get(&column.name) {
            None => column.clone(),
            Some(TypeDecl::Unrecognized(tag)) => {
                let warning = CoercionWarning::UnknownTypeTag {
                    column: column.name.clone(),
                    tag: tag.clone(),
                };
                warn!("{warning}");
                warnings.push(warning);
                column.clone()
            }
            Some(TypeDecl::Known(target)) => {
                let mut cells = Vec::with_capacity(column.len());
                for (idx, cell) in column.cells.iter().enumerate() {
                    let converted = match cell {
                        None => None,
                        Some(value) => Some(convert_value(value, *target).ok_or_else(|| {
                            TableError::TypeCoercion {
                                column: column.name.clone(),
                                row: idx + 1,
                                value: value.as_display(),
                                target: *target,
                            }
                        })?),
                    };
                    cells.push(converted);
                }
                debug!("Coerced column '{}' to {}", column.name, target);
                Column::new(column.name.clone(), cells)
            }
        };
        columns.push(coerced);
    }

    Ok(Coerced {
        table: Table::new(columns)?,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ColumnType, Value};

    fn raw(columns: &[(&str, &[&str])]) -> Table {
        let columns = columns
            .iter()
            .map(|(name, values)| {
                let cells = values
                    .iter()
                    .map(|v| (!v.is_empty()).then(|| Value::String(v.to_string())))
                    .collect();
                Column::new(*name, cells)
            })
            .collect();
        Table::new(columns).unwrap()
    }

    #[test]
    fn coerce_applies_declared_types() {
        let table = raw(&[("col1", &["1", "2"]), ("col2", &["3.0", "4.0"])]);
        let map = TypeMap::new().with("col1", "int").with("col2", "float");
        let coerced = coerce(&table, &map).unwrap();
        assert!(coerced.warnings.is_empty());
        assert_eq!(
            coerced.table.column("col1").unwrap().cells,
            vec![Some(Value::Integer(1)), Some(Value::Integer(2))]
        );
        assert_eq!(
            coerced.table.column("col2").unwrap().cells,
            vec![Some(Value::Float(3.0)), Some(Value::Float(4.0))]
        );
    }

    #[test]
    fn coerce_leaves_unmapped_columns_and_input_untouched() {
        let table = raw(&[("rating", &["9"]), ("review", &["good"])]);
        let map = TypeMap::new().with("rating", "int");
        let coerced = coerce(&table, &map).unwrap();
        assert_eq!(
            coerced.table.column("review").unwrap().cells,
            vec![Some(Value::String("good".to_string()))]
        );
        assert_eq!(
            table.column("rating").unwrap().cells,
            vec![Some(Value::String("9".to_string()))]
        );
    }

    #[test]
    fn coerce_keeps_nulls() {
        let table = raw(&[("rating", &["", "3"])]);
        let map = TypeMap::new().with("rating", "int");
        let coerced = coerce(&table, &map).unwrap();
        assert_eq!(
            coerced.table.column("rating").unwrap().cells,
            vec![None, Some(Value::Integer(3))]
        );
    }

    #[test]
    fn coerce_reports_missing_column() {
        let table = raw(&[("rating", &["1"])]);
        let map = TypeMap::new().with("rating", "int").with("condition", "string");
        assert_eq!(
            coerce(&table, &map),
            Err(TableError::MissingColumn {
                column: "condition".to_string()
            })
        );
    }

    #[test]
    fn coerce_fails_fast_on_unconvertible_value() {
        let table = raw(&[("rating", &["7", "ten", "oops"])]);
        let map = TypeMap::new().with("rating", "int");
        assert_eq!(
            coerce(&table, &map),
            Err(TableError::TypeCoercion {
                column: "rating".to_string(),
                row: 2,
                value: "ten".to_string(),
                target: ColumnType::Integer,
            })
        );
    }

    #[test]
    fn coerce_records_unrecognized_tag_and_passes_column_through() {
        let table = raw(&[("rating", &["7"]), ("reviewed_at", &["2024-01-01"])]);
        let map = TypeMap::new().with("rating", "int").with("reviewed_at", "timestamp");
        let coerced = coerce(&table, &map).unwrap();
        assert_eq!(
            coerced.warnings,
            vec![CoercionWarning::UnknownTypeTag {
                column: "reviewed_at".to_string(),
                tag: "timestamp".to_string(),
            }]
        );
        assert_eq!(
            coerced.table.column("reviewed_at"),
            table.column("reviewed_at")
        );
    }
}
