use crate::value::CellValue;
use serde::{Deserialize, Serialize};

/// Comparison operator for one filter criterion.
///
/// Comparison values are interpreted using the declared type of the target
/// column (numeric, temporal, or ordinal string), not by sniffing the runtime
/// value. `Regex` carries the pattern source; compilation (and rejection of
/// invalid patterns) happens when criteria are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals(CellValue),
    NotEquals(CellValue),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    GreaterThan(CellValue),
    LessThan(CellValue),
    Between { min: CellValue, max: CellValue },
    IsNull,
    IsNotNull,
    Regex(String),
}

/// One per-column predicate. Active criteria combine with logical AND across
/// columns: a row is in the filtered view iff it satisfies every criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub column: String,
    pub op: FilterOp,
    /// Text comparisons are case-insensitive unless set.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl FilterCriterion {
    pub fn new(column: impl Into<String>, op: FilterOp) -> Self {
        Self {
            column: column.into(),
            op,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}
