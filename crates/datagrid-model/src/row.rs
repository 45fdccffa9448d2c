use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of a row.
///
/// Assigned by the row store at creation, globally unique for the lifetime of
/// the store, and never reused — even across delete/re-add cycles. RowIds are
/// an internal handle and must never be imported from or exported to external
/// data formats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A single row: stable identity, display sequence number, and cells keyed by
/// column name.
///
/// `number` is a display-order sequence that may be recomputed (compacted)
/// after deletions; it is not a stable handle. Cells for columns absent from
/// the map read as [`CellValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub number: u64,
    pub cells: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn cell(&self, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.cells.get(column).unwrap_or(&NULL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_cell_reads_as_null() {
        let row = Row {
            id: RowId(1),
            number: 1,
            cells: BTreeMap::from([("a".to_string(), CellValue::Number(1.0))]),
        };
        assert_eq!(row.cell("a"), &CellValue::Number(1.0));
        assert_eq!(row.cell("missing"), &CellValue::Null);
    }

    #[test]
    fn row_id_displays_with_prefix() {
        assert_eq!(RowId(42).to_string(), "r42");
    }
}
