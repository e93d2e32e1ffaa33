//! Column → type declarations driving coercion.
//!
//! A type map is a flat mapping document, JSON or YAML depending on the file
//! extension:
//!
//! ```json
//! { "rating": "int", "urlDrugName": "string" }
//! ```
//!
//! Tags outside the recognized set are kept as [`TypeDecl::Unrecognized`] so
//! the coercer can report them instead of failing the load.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::ColumnType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TypeDecl {
    Known(ColumnType),
    Unrecognized(String),
}

impl From<String> for TypeDecl {
    fn from(tag: String) -> Self {
        match tag.parse::<ColumnType>() {
            Ok(ty) => TypeDecl::Known(ty),
            Err(_) => TypeDecl::Unrecognized(tag),
        }
    }
}

impl From<TypeDecl> for String {
    fn from(value: TypeDecl) -> Self {
        match value {
            TypeDecl::Known(ty) => ty.as_str().to_string(),
            TypeDecl::Unrecognized(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeMap {
    entries: BTreeMap<String, TypeDecl>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, tag: &str) -> Self {
        self.insert(column, tag);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, tag: &str) {
        self.entries
            .insert(column.into(), TypeDecl::from(tag.to_string()));
    }

    pub fn get(&self, column: &str) -> Option<&TypeDecl> {
        self.entries.get(column)
    }

    /// Mapped columns in sorted order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Parsing type map JSON")
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context("Parsing type map YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening type map file {path:?}"))?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        let map = if is_yaml {
            Self::from_yaml_str(&raw)
        } else {
            Self::from_json_str(&raw)
        };
        map.with_context(|| format!("Loading type map from {path:?}"))
    }
}
