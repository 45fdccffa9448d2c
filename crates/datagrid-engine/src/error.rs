use datagrid_model::RowId;
use thiserror::Error;

/// Errors from row store mutations.
///
/// Lookups by unknown [`RowId`] are not errors; they return `Option`/outcome
/// values. `RowNotFound` appears only in the all-or-nothing batch path, where
/// the caller asked for atomicity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },
    #[error("row {id} not found")]
    RowNotFound { id: RowId },
    #[error("insert index {index} out of bounds (row count {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// One rejected criterion within a `set_criteria` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("criterion {index} on column '{column}': {reason}")]
pub struct CriterionIssue {
    pub index: usize,
    pub column: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The call is rejected as a whole; the previous filter state is kept.
    #[error("rejected {} filter criteria", offending.len())]
    InvalidCriteria { offending: Vec<CriterionIssue> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("unknown sort column '{column}'")]
    UnknownColumn { column: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("unknown search column '{column}'")]
    UnknownColumn { column: String },
    #[error("invalid search pattern: {reason}")]
    InvalidPattern { reason: String },
    #[error("fuzzy threshold {threshold} is outside [0, 1]")]
    InvalidThreshold { threshold: f64 },
    #[error("search cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    #[error("validation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page size must be at least 1")]
    InvalidPageSize,
}
