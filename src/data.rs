use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primitive column types a type map or contract may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown column type '{0}'. Supported types: int, float, string, bool")]
pub struct UnknownColumnType(pub String);

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::Boolean => "bool",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "int" | "integer" => Ok(ColumnType::Integer),
            "float" | "double" => Ok(ColumnType::Float),
            "string" | "text" | "str" => Ok(ColumnType::String),
            "bool" | "boolean" => Ok(ColumnType::Boolean),
            _ => Err(UnknownColumnType(value.to_string())),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = UnknownColumnType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::String(_) => ColumnType::String,
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Boolean(_) => ColumnType::Boolean,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Converts a single value to `target`, returning `None` when no lossless conversion exists.
pub fn convert_value(value: &Value, target: ColumnType) -> Option<Value> {
    match (value, target) {
        (Value::String(text), _) => parse_text(text, target),
        (other, ColumnType::String) => Some(Value::String(other.as_display())),
        (Value::Integer(i), ColumnType::Integer) => Some(Value::Integer(*i)),
        (Value::Integer(i), ColumnType::Float) => Some(Value::Float(*i as f64)),
        (Value::Integer(i), ColumnType::Boolean) => match i {
            0 => Some(Value::Boolean(false)),
            1 => Some(Value::Boolean(true)),
            _ => None,
        },
        (Value::Float(f), ColumnType::Float) => Some(Value::Float(*f)),
        (Value::Float(f), ColumnType::Integer) => {
            if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64
            {
                Some(Value::Integer(*f as i64))
            } else {
                None
            }
        }
        (Value::Float(_), ColumnType::Boolean) => None,
        (Value::Boolean(b), ColumnType::Boolean) => Some(Value::Boolean(*b)),
        (Value::Boolean(b), ColumnType::Integer) => Some(Value::Integer(i64::from(*b))),
        (Value::Boolean(b), ColumnType::Float) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
    }
}

fn parse_text(text: &str, target: ColumnType) -> Option<Value> {
    let trimmed = text.trim();
    match target {
        ColumnType::String => Some(Value::String(text.to_string())),
        ColumnType::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Float => trimmed.parse::<f64>().ok().map(Value::Float),
        ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Some(Value::Boolean(true)),
            "false" | "f" | "no" | "n" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
    }
}
