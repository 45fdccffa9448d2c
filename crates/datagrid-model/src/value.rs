use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single cell value.
///
/// `Null` doubles as "cell absent": a row that carries no entry for a column
/// is treated identically to one that stores an explicit `Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
            || matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// Logical type of a column, used for type-aware comparison.
///
/// Comparison semantics (filtering, sorting, search coercion) are chosen from
/// the declared column type, never inferred from runtime value inspection
/// alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Number,
    Text,
    Bool,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Errors that can occur when building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column name cannot be empty")]
    EmptyName,
    #[error("duplicate column name '{name}'")]
    DuplicateName { name: String },
}

/// Ordered column schema for one dataset.
///
/// The schema is owned by the host; the engine only consults it for column
/// lookup and type-aware comparison. Column names are matched exactly
/// (case-sensitive), mirroring how hosts key row cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSchema {
    columns: Vec<ColumnSchema>,
}

impl GridSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Result<Self, SchemaError> {
        for (i, col) in columns.iter().enumerate() {
            if col.name.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(SchemaError::DuplicateName {
                    name: col.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
