//! Multi-key stable sort over row identities.
//!
//! Descriptors are validated against the schema before any reordering happens,
//! so an unknown column leaves the prior order fully intact. Sorting never
//! moves row content; it permutes `RowId` sequences owned by the view layer.

use crate::compare::{compare_typed, is_orderable};
use crate::error::SortError;
use crate::store::RowStore;
use datagrid_model::{CellValue, ColumnType, GridSchema, Row, RowId, SortDescriptor, SortDirection};
use smallvec::SmallVec;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
struct CompiledKey {
    column: String,
    column_type: ColumnType,
    direction: SortDirection,
}

/// A validated multi-key comparator. Interactive sorts rarely carry more than
/// a few keys, so they live inline.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSort {
    keys: SmallVec<[CompiledKey; 4]>,
}

impl CompiledSort {
    pub(crate) fn compile(
        descriptors: &[SortDescriptor],
        schema: &GridSchema,
    ) -> Result<Self, SortError> {
        let mut keys = SmallVec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let Some(column_type) = schema.column_type(&descriptor.column) else {
                return Err(SortError::UnknownColumn {
                    column: descriptor.column.clone(),
                });
            };
            keys.push(CompiledKey {
                column: descriptor.column.clone(),
                column_type,
                direction: descriptor.direction,
            });
        }
        Ok(Self { keys })
    }

    /// Stable sort of `ids` by the compiled keys. Ties after the last key keep
    /// their prior relative order.
    pub(crate) fn sort_ids(&self, store: &RowStore, ids: &mut [RowId]) {
        ids.sort_by(|&a, &b| {
            match (store.get(a), store.get(b)) {
                (Some(ra), Some(rb)) => self.compare_rows(ra, rb),
                // Missing rows only occur transiently mid-rebuild; park them last.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }

    fn compare_rows(&self, a: &Row, b: &Row) -> Ordering {
        for key in &self.keys {
            let ordering = compare_key(a.cell(&key.column), b.cell(&key.column), key.column_type);
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Nulls and values that do not coerce into the column's domain form one
/// group that sorts first ascending, last descending. Grouping them together
/// keeps the comparator a total order, which `sort_by` requires.
fn compare_key(a: &CellValue, b: &CellValue, ty: ColumnType) -> Ordering {
    match (is_orderable(a, ty), is_orderable(b, ty)) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => compare_typed(a, b, ty, false).unwrap_or(Ordering::Equal),
    }
}
