//! Declarative per-column contract checked by the validator.
//!
//! Contracts are YAML documents:
//!
//! ```yaml
//! mode: strict
//! columns:
//!   - name: id
//!     type: int
//!   - name: rating
//!     type: int
//!     nullable: false
//!     min: 1
//!     max: 10
//! ```
//!
//! `nullable` defaults to `false` and `mode` to `strict`. Bounds are inclusive
//! and only valid on numeric columns; this is enforced when a contract is
//! built or loaded, not at validation time.

use std::{collections::HashSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{ColumnType, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("Column '{0}' is declared more than once in the contract")]
    DuplicateRule(String),
    #[error("Column '{column}' declares bounds but its type {datatype} is not numeric")]
    BoundsOnNonNumeric {
        column: String,
        datatype: ColumnType,
    },
    #[error("Column '{column}' declares min {min} greater than max {max}")]
    InvertedBounds { column: String, min: f64, max: f64 },
    #[error("Column '{column}' declares a non-finite bound")]
    NonFiniteBound { column: String },
}

/// How the validator treats table columns the contract does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractMode {
    #[default]
    Strict,
    Permissive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub name: String,
    #[serde(rename = "type")]
    pub datatype: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ColumnRule {
    pub fn new(name: impl Into<String>, datatype: ColumnType) -> Self {
        Self {
            name: name.into(),
            datatype,
            nullable: false,
            min: None,
            max: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn in_bounds(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// Bounds check for a cell value. Integers are compared exactly, without a
    /// round trip through `f64`.
    pub fn admits(&self, value: &Value) -> bool {
        match value {
            Value::Integer(i) => {
                let i = i128::from(*i);
                self.min.is_none_or(|min| i >= min.ceil() as i128)
                    && self.max.is_none_or(|max| i <= max.floor() as i128)
            }
            other => other.as_f64().is_none_or(|number| self.in_bounds(number)),
        }
    }

    fn check(&self) -> Result<(), ContractError> {
        if !self.has_bounds() {
            return Ok(());
        }
        if !self.datatype.is_numeric() {
            return Err(ContractError::BoundsOnNonNumeric {
                column: self.name.clone(),
                datatype: self.datatype,
            });
        }
        if self.min.is_some_and(|v| !v.is_finite()) || self.max.is_some_and(|v| !v.is_finite()) {
            return Err(ContractError::NonFiniteBound {
                column: self.name.clone(),
            });
        }
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(ContractError::InvertedBounds {
                column: self.name.clone(),
                min,
                max,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContract {
    #[serde(default)]
    pub mode: ContractMode,
    pub columns: Vec<ColumnRule>,
}

impl SchemaContract {
    pub fn new(mode: ContractMode, columns: Vec<ColumnRule>) -> Result<Self, ContractError> {
        let contract = Self { mode, columns };
        contract.check_rules()?;
        Ok(contract)
    }

    pub fn rule(&self, column: &str) -> Option<&ColumnRule> {
        self.columns.iter().find(|rule| rule.name == column)
    }

    pub fn check_rules(&self) -> Result<(), ContractError> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for rule in &self.columns {
            if !seen.insert(rule.name.as_str()) {
                return Err(ContractError::DuplicateRule(rule.name.clone()));
            }
            rule.check()?;
        }
        Ok(())
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let contract: SchemaContract =
            serde_yaml::from_str(input).context("Parsing contract YAML")?;
        contract.check_rules()?;
        Ok(contract)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening contract file {path:?}"))?;
        let reader = BufReader::new(file);
        let contract: SchemaContract =
            serde_yaml::from_reader(reader).context("Parsing contract YAML")?;
        contract
            .check_rules()
            .with_context(|| format!("Checking contract {path:?}"))?;
        Ok(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_contract_applies_defaults() {
        let contract = SchemaContract::from_yaml_str(
            "columns:\n  - name: rating\n    type: int\n    min: 1\n    max: 10\n  - name: condition\n    type: text\n    nullable: true\n",
        )
        .unwrap();
        assert_eq!(contract.mode, ContractMode::Strict);
        let rating = contract.rule("rating").unwrap();
        assert_eq!(rating.datatype, ColumnType::Integer);
        assert!(!rating.nullable);
        assert_eq!((rating.min, rating.max), (Some(1.0), Some(10.0)));
        assert!(contract.rule("condition").unwrap().nullable);
    }

    #[test]
    fn yaml_contract_reads_permissive_mode() {
        let contract =
            SchemaContract::from_yaml_str("mode: permissive\ncolumns: []\n").unwrap();
        assert_eq!(contract.mode, ContractMode::Permissive);
    }

    #[test]
    fn contract_rejects_bounds_on_text_column() {
        let result = SchemaContract::new(
            ContractMode::Strict,
            vec![ColumnRule::new("condition", ColumnType::String).with_bounds(Some(1.0), None)],
        );
        assert!(matches!(
            result,
            Err(ContractError::BoundsOnNonNumeric { .. })
        ));
    }

    #[test]
    fn contract_rejects_inverted_bounds_and_duplicates() {
        let inverted = SchemaContract::new(
            ContractMode::Strict,
            vec![ColumnRule::new("rating", ColumnType::Integer).with_bounds(Some(10.0), Some(1.0))],
        );
        assert!(matches!(inverted, Err(ContractError::InvertedBounds { .. })));

        let duplicate = SchemaContract::new(
            ContractMode::Strict,
            vec![
                ColumnRule::new("rating", ColumnType::Integer),
                ColumnRule::new("rating", ColumnType::Float),
            ],
        );
        assert_eq!(
            duplicate,
            Err(ContractError::DuplicateRule("rating".to_string()))
        );
    }

    #[test]
    fn unknown_type_in_contract_fails_to_parse() {
        assert!(
            SchemaContract::from_yaml_str("columns:\n  - name: a\n    type: decimal\n").is_err()
        );
    }

    #[test]
    fn in_bounds_is_inclusive() {
        let rule = ColumnRule::new("rating", ColumnType::Integer).with_bounds(Some(1.0), Some(10.0));
        assert!(rule.in_bounds(1.0));
        assert!(rule.in_bounds(10.0));
        assert!(!rule.in_bounds(0.0));
        assert!(!rule.in_bounds(11.0));
    }

    #[test]
    fn admits_compares_large_integers_exactly() {
        let rule = ColumnRule::new("count", ColumnType::Integer)
            .with_bounds(Some(-9_007_199_254_740_992.0), Some(9_007_199_254_740_992.0));
        assert!(rule.admits(&Value::Integer(9_007_199_254_740_992)));
        assert!(!rule.admits(&Value::Integer(9_007_199_254_740_993)));
        assert!(!rule.admits(&Value::Integer(-9_007_199_254_740_993)));
    }

    #[test]
    fn admits_rounds_fractional_bounds_inward_for_integers() {
        let rule = ColumnRule::new("rating", ColumnType::Integer).with_bounds(Some(1.5), Some(9.5));
        assert!(!rule.admits(&Value::Integer(1)));
        assert!(rule.admits(&Value::Integer(2)));
        assert!(rule.admits(&Value::Integer(9)));
        assert!(!rule.admits(&Value::Integer(10)));
        assert!(rule.admits(&Value::Float(9.5)));
        assert!(!rule.admits(&Value::Float(9.75)));
    }
}
