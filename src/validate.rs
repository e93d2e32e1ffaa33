//! Lazy contract validation.
//!
//! [`validate()`] never stops at the first problem: every rule is evaluated
//! against every row and all findings are returned in one
//! [`ValidationReport`]. Row numbers are 1-based data rows.

use std::fmt;

use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::{
    contract::{ColumnRule, ContractMode, SchemaContract},
    data::ColumnType,
    frame::{Column, Table},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("Row {row} column '{column}': expected {expected} but found {actual} '{value}'")]
    TypeMismatch {
        column: String,
        row: usize,
        expected: ColumnType,
        actual: ColumnType,
        value: String,
    },
    #[error("Row {row} column '{column}': missing value in non-nullable column")]
    NullViolation { column: String, row: usize },
    #[error("Row {row} column '{column}': {value} is outside [{}, {}]", bound(.min), bound(.max))]
    RangeViolation {
        column: String,
        row: usize,
        value: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[error("Column '{column}' is not declared in the contract")]
    UnexpectedColumn { column: String },
    #[error("Column '{column}' is declared in the contract but missing from the table")]
    MissingColumn { column: String },
}

fn bound(value: &Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl Violation {
    pub fn column(&self) -> &str {
        match self {
            Violation::TypeMismatch { column, .. }
            | Violation::NullViolation { column, .. }
            | Violation::RangeViolation { column, .. }
            | Violation::UnexpectedColumn { column }
            | Violation::MissingColumn { column } => column,
        }
    }

    pub fn row(&self) -> Option<usize> {
        match self {
            Violation::TypeMismatch { row, .. }
            | Violation::NullViolation { row, .. }
            | Violation::RangeViolation { row, .. } => Some(*row),
            Violation::UnexpectedColumn { .. } | Violation::MissingColumn { .. } => None,
        }
    }

    pub fn rule(&self) -> &'static str {
        match self {
            Violation::TypeMismatch { .. } => "type",
            Violation::NullViolation { .. } => "nullable",
            Violation::RangeViolation { .. } => "range",
            Violation::UnexpectedColumn { .. } => "unexpected",
            Violation::MissingColumn { .. } => "missing",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Header and rows for rendering the report with [`crate::table::render_table`].
    pub fn to_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = ["row", "column", "rule", "detail"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let rows = self
            .violations
            .iter()
            .map(|violation| {
                vec![
                    violation.row().map(|r| r.to_string()).unwrap_or_default(),
                    violation.column().to_string(),
                    violation.rule().to_string(),
                    violation.to_string(),
                ]
            })
            .collect();
        (headers, rows)
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no contract violations");
        }
        let columns = self.violations.iter().map(Violation::column).unique().count();
        write!(
            f,
            "{} contract violation(s) across {} column(s): {}",
            self.violations.len(),
            columns,
            self.violations.iter().take(5).join("; ")
        )?;
        if self.violations.len() > 5 {
            write!(f, "; ...")?;
        }
        Ok(())
    }
}

pub fn validate(table: &Table, contract: &SchemaContract) -> ValidationReport {
    let mut report = ValidationReport::default();
    for rule in &contract.columns {
        match table.column(&rule.name) {
            Some(column) => check_column(column, rule, &mut report),
            None => report.push(Violation::MissingColumn {
                column: rule.name.clone(),
            }),
        }
    }
    if contract.mode == ContractMode::Strict {
        for column in table.columns() {
            if contract.rule(&column.name).is_none() {
                report.push(Violation::UnexpectedColumn {
                    column: column.name.clone(),
                });
            }
        }
    }
    debug!(
        "Validated {} row(s) against {} rule(s): {} violation(s)",
        table.row_count(),
        contract.columns.len(),
        report.len()
    );
    report
}

fn check_column(column: &Column, rule: &ColumnRule, report: &mut ValidationReport) {
    for (idx, cell) in column.cells.iter().enumerate() {
        let row = idx + 1;
        let Some(value) = cell else {
            if !rule.nullable {
                report.push(Violation::NullViolation {
                    column: column.name.clone(),
                    row,
                });
            }
            continue;
        };
        if value.column_type() != rule.datatype {
            report.push(Violation::TypeMismatch {
                column: column.name.clone(),
                row,
                expected: rule.datatype,
                actual: value.column_type(),
                value: value.as_display(),
            });
            continue;
        }
        if rule.has_bounds() && !rule.admits(value) {
            report.push(Violation::RangeViolation {
                column: column.name.clone(),
                row,
                value: value.as_display(),
                min: rule.min,
                max: rule.max,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, frame::Cell};

    fn rating_contract(mode: ContractMode) -> SchemaContract {
        SchemaContract::new(
            mode,
            vec![
                ColumnRule::new("rating", ColumnType::Integer)
                    .with_bounds(Some(1.0), Some(10.0)),
            ],
        )
        .unwrap()
    }

    fn rating_table(cells: Vec<Cell>) -> Table {
        Table::new(vec![Column::new("rating", cells)]).unwrap()
    }

    #[test]
    fn rating_bounds_and_nullability() {
        let table = rating_table(vec![
            Some(Value::Integer(11)),
            Some(Value::Integer(0)),
            None,
            Some(Value::Integer(7)),
        ]);
        let report = validate(&table, &rating_contract(ContractMode::Strict));
        assert_eq!(report.len(), 3);
        assert!(matches!(
            report.violations()[0],
            Violation::RangeViolation { row: 1, .. }
        ));
        assert!(matches!(
            report.violations()[1],
            Violation::RangeViolation { row: 2, .. }
        ));
        assert_eq!(
            report.violations()[2],
            Violation::NullViolation {
                column: "rating".to_string(),
                row: 3
            }
        );
    }

    #[test]
    fn in_range_value_is_accepted() {
        let table = rating_table(vec![Some(Value::Integer(7))]);
        assert!(validate(&table, &rating_contract(ContractMode::Strict)).is_empty());
    }

    #[test]
    fn type_mismatch_is_reported_without_range_check() {
        let table = rating_table(vec![Some(Value::String("9".to_string()))]);
        let report = validate(&table, &rating_contract(ContractMode::Strict));
        assert_eq!(
            report.violations(),
            &[Violation::TypeMismatch {
                column: "rating".to_string(),
                row: 1,
                expected: ColumnType::Integer,
                actual: ColumnType::String,
                value: "9".to_string(),
            }]
        );
    }

    #[test]
    fn unexpected_columns_depend_on_mode() {
        let table = Table::new(vec![
            Column::new("rating", vec![Some(Value::Integer(5))]),
            Column::new("extra", vec![None]),
        ])
        .unwrap();
        let strict = validate(&table, &rating_contract(ContractMode::Strict));
        assert_eq!(
            strict.violations(),
            &[Violation::UnexpectedColumn {
                column: "extra".to_string()
            }]
        );
        let permissive = validate(&table, &rating_contract(ContractMode::Permissive));
        assert!(permissive.is_empty());
    }

    #[test]
    fn declared_column_missing_from_table_is_reported() {
        let table = Table::new(vec![Column::new("other", vec![])]).unwrap();
        let report = validate(&table, &rating_contract(ContractMode::Permissive));
        assert_eq!(
            report.violations(),
            &[Violation::MissingColumn {
                column: "rating".to_string()
            }]
        );
    }

    #[test]
    fn validation_collects_every_violation() {
        let contract = SchemaContract::new(
            ContractMode::Strict,
            vec![
                ColumnRule::new("rating", ColumnType::Integer)
                    .with_bounds(Some(1.0), Some(10.0)),
                ColumnRule::new("condition", ColumnType::String),
            ],
        )
        .unwrap();
        let table = Table::new(vec![
            Column::new("rating", vec![Some(Value::Integer(12)), None]),
            Column::new("condition", vec![None, Some(Value::Integer(3))]),
            Column::new("note", vec![None, None]),
        ])
        .unwrap();
        let report = validate(&table, &contract);
        let rules = report.violations().iter().map(Violation::rule).collect::<Vec<_>>();
        assert_eq!(rules, vec!["range", "nullable", "nullable", "type", "unexpected"]);
        assert_eq!(
            report
                .violations()
                .iter()
                .filter(|v| v.column() == "condition")
                .count(),
            2
        );
    }

    #[test]
    fn integers_beyond_float_precision_still_break_bounds() {
        let contract = SchemaContract::new(
            ContractMode::Strict,
            vec![
                ColumnRule::new("rating", ColumnType::Integer)
                    .with_bounds(None, Some(9_007_199_254_740_992.0)),
            ],
        )
        .unwrap();
        let table = rating_table(vec![
            Some(Value::Integer(9_007_199_254_740_992)),
            Some(Value::Integer(9_007_199_254_740_993)),
        ]);
        let report = validate(&table, &contract);
        assert_eq!(report.len(), 1);
        assert_eq!(report.violations()[0].rule(), "range");
        assert_eq!(report.violations()[0].row(), Some(2));
    }

    #[test]
    fn report_renders_rows_and_summary() {
        let table = rating_table(vec![Some(Value::Integer(0))]);
        let report = validate(&table, &rating_contract(ContractMode::Strict));
        let (headers, rows) = report.to_rows();
        assert_eq!(headers, vec!["row", "column", "rule", "detail"]);
        assert_eq!(rows[0][0], "1");
        assert_eq!(rows[0][2], "range");
        assert!(report.to_string().starts_with("1 contract violation(s) across 1 column(s)"));
        assert_eq!(ValidationReport::default().to_string(), "no contract violations");
    }
}
