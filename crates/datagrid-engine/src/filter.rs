//! Criterion compilation and the filtered-view index.
//!
//! Criteria are validated and compiled up front (`set_criteria` rejects the
//! whole batch and preserves the previous filter state when any criterion is
//! malformed). The index itself is a derived, rebuildable projection: a
//! forward array of matching `RowId`s in view order plus the reverse
//! position map.

use crate::compare::{
    cell_to_text, compare_typed, text_contains, text_ends_with, text_starts_with,
};
use crate::error::{CriterionIssue, FilterError};
use crate::store::RowStore;
use ahash::AHashMap;
use datagrid_model::{CellValue, ColumnType, FilterCriterion, FilterOp, GridSchema, Row, RowId};
use regex::Regex;
use std::cmp::Ordering;

/// One validated criterion, with its regex pre-compiled and the target
/// column's type resolved from the schema.
#[derive(Debug, Clone)]
pub(crate) struct CompiledCriterion {
    pub(crate) column: String,
    column_type: ColumnType,
    case_sensitive: bool,
    op: FilterOp,
    regex: Option<Regex>,
}

impl CompiledCriterion {
    fn compile(
        index: usize,
        criterion: &FilterCriterion,
        schema: &GridSchema,
    ) -> Result<Self, CriterionIssue> {
        let issue = |reason: String| CriterionIssue {
            index,
            column: criterion.column.clone(),
            reason,
        };

        let Some(column_type) = schema.column_type(&criterion.column) else {
            return Err(issue("unknown column".to_string()));
        };

        let mut regex = None;
        match &criterion.op {
            FilterOp::Regex(pattern) => {
                let built = if criterion.case_sensitive {
                    Regex::new(pattern)
                } else {
                    Regex::new(&format!("(?i){pattern}"))
                };
                regex = Some(built.map_err(|e| issue(format!("invalid regex: {e}")))?);
            }
            FilterOp::GreaterThan(v) | FilterOp::LessThan(v) => {
                check_comparable(v, column_type).map_err(&issue)?;
            }
            FilterOp::Between { min, max } => {
                check_comparable(min, column_type).map_err(&issue)?;
                check_comparable(max, column_type).map_err(&issue)?;
            }
            FilterOp::Equals(_)
            | FilterOp::NotEquals(_)
            | FilterOp::Contains(_)
            | FilterOp::StartsWith(_)
            | FilterOp::EndsWith(_)
            | FilterOp::IsNull
            | FilterOp::IsNotNull => {}
        }

        Ok(Self {
            column: criterion.column.clone(),
            column_type,
            case_sensitive: criterion.case_sensitive,
            op: criterion.op.clone(),
            regex,
        })
    }

    pub(crate) fn matches(&self, row: &Row) -> bool {
        let cell = row.cell(&self.column);
        match &self.op {
            FilterOp::IsNull => cell.is_null(),
            FilterOp::IsNotNull => !cell.is_null(),
            FilterOp::Equals(value) => self.cmp_cell(cell, value) == Some(Ordering::Equal),
            FilterOp::NotEquals(value) => {
                // Nulls and incomparable values are "not equal" to anything.
                self.cmp_cell(cell, value) != Some(Ordering::Equal)
            }
            FilterOp::GreaterThan(value) => self.cmp_cell(cell, value) == Some(Ordering::Greater),
            FilterOp::LessThan(value) => self.cmp_cell(cell, value) == Some(Ordering::Less),
            FilterOp::Between { min, max } => {
                matches!(
                    self.cmp_cell(cell, min),
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ) && matches!(
                    self.cmp_cell(cell, max),
                    Some(Ordering::Less) | Some(Ordering::Equal)
                )
            }
            FilterOp::Contains(needle) => {
                text_contains(&cell_to_text(cell), needle, self.case_sensitive)
            }
            FilterOp::StartsWith(needle) => {
                text_starts_with(&cell_to_text(cell), needle, self.case_sensitive)
            }
            FilterOp::EndsWith(needle) => {
                text_ends_with(&cell_to_text(cell), needle, self.case_sensitive)
            }
            FilterOp::Regex(_) => match &self.regex {
                Some(re) => re.is_match(&cell_to_text(cell)),
                None => false,
            },
        }
    }

    /// Nulls are incomparable: they fail every ordered/equality criterion and
    /// pass `NotEquals` (and `IsNull`).
    fn cmp_cell(&self, cell: &CellValue, reference: &CellValue) -> Option<Ordering> {
        if cell.is_null() || reference.is_null() {
            return None;
        }
        compare_typed(cell, reference, self.column_type, self.case_sensitive)
    }
}

fn check_comparable(value: &CellValue, ty: ColumnType) -> Result<(), String> {
    if crate::compare::is_orderable(value, ty) {
        Ok(())
    } else {
        Err(format!("comparison value is not usable as {ty:?}"))
    }
}

/// Compile a criteria batch, rejecting the whole batch when anything is
/// malformed. The caller receives every offending criterion, not just the
/// first.
pub(crate) fn compile_criteria(
    criteria: &[FilterCriterion],
    schema: &GridSchema,
) -> Result<Vec<CompiledCriterion>, FilterError> {
    let mut compiled = Vec::with_capacity(criteria.len());
    let mut offending = Vec::new();
    for (index, criterion) in criteria.iter().enumerate() {
        match CompiledCriterion::compile(index, criterion, schema) {
            Ok(c) => compiled.push(c),
            Err(issue) => offending.push(issue),
        }
    }
    if offending.is_empty() {
        Ok(compiled)
    } else {
        Err(FilterError::InvalidCriteria { offending })
    }
}

pub(crate) fn row_matches_all(row: &Row, criteria: &[CompiledCriterion]) -> bool {
    criteria.iter().all(|c| c.matches(row))
}

/// Bidirectional mapping `filtered position ↔ RowId`.
///
/// Valid only while current; any criteria change or qualifying row mutation
/// invalidates it and the owner rebuilds lazily. Rebuilding with identical
/// criteria over identical rows yields an identical order (the scan follows
/// the display order it is given).
#[derive(Debug, Clone, Default)]
pub struct FilterIndex {
    positions: Vec<RowId>,
    reverse: AHashMap<RowId, usize>,
}

impl FilterIndex {
    /// Single O(n) scan over `display_order`, recording each matching row.
    pub(crate) fn build(
        store: &RowStore,
        display_order: &[RowId],
        criteria: &[CompiledCriterion],
    ) -> Self {
        let mut positions = Vec::new();
        for &id in display_order {
            let Some(row) = store.get(id) else { continue };
            if row_matches_all(row, criteria) {
                positions.push(id);
            }
        }
        let reverse = positions
            .iter()
            .enumerate()
            .map(|(pos, &id)| (id, pos))
            .collect();
        Self { positions, reverse }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Filtered positions in view order.
    pub fn positions(&self) -> &[RowId] {
        &self.positions
    }

    /// The sanctioned way to translate a filtered position into the identity
    /// needed for a store write.
    pub fn row_id_at(&self, position: usize) -> Option<RowId> {
        self.positions.get(position).copied()
    }

    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.reverse.get(&id).copied()
    }

    /// Replace the filtered order (sort-on-filtered-view). The new order must
    /// be a permutation of the current positions.
    pub(crate) fn reorder(&mut self, new_order: Vec<RowId>) {
        debug_assert_eq!(new_order.len(), self.positions.len());
        self.reverse = new_order
            .iter()
            .enumerate()
            .map(|(pos, &id)| (id, pos))
            .collect();
        self.positions = new_order;
    }
}
