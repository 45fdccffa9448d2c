use crate::error::StoreError;
use ahash::AHashMap;
use datagrid_model::{CellValue, GridSchema, Row, RowId};
use std::collections::BTreeMap;

/// Per-item outcome of a non-atomic batch removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

/// Canonical owner of all rows.
///
/// The store is an arena keyed by [`RowId`] plus an insertion-order sequence.
/// It is the only component allowed to mutate row content or row count; every
/// derived structure (filter index, sort buffers, search results) holds only
/// `RowId`s or positions.
///
/// Identity guarantees: `append`/`insert_at` assign a fresh, never-reused
/// `RowId` and the next sequential row number. Removal never shifts other
/// rows' ids. Row numbers may develop gaps after deletions;
/// [`RowStore::compact_row_numbers`] removes them as an explicit maintenance
/// operation (never automatically, to avoid O(n) cost per delete).
#[derive(Debug)]
pub struct RowStore {
    schema: GridSchema,
    rows: AHashMap<RowId, Row>,
    order: Vec<RowId>,
    next_id: u64,
    next_number: u64,
}

impl RowStore {
    pub fn new(schema: GridSchema) -> Self {
        Self {
            schema,
            rows: AHashMap::new(),
            order: Vec::new(),
            next_id: 1,
            next_number: 1,
        }
    }

    pub fn schema(&self) -> &GridSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Canonical (insertion) order of all rows.
    pub fn order(&self) -> &[RowId] {
        &self.order
    }

    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Position of a row in canonical order. O(n); intended for diagnostics,
    /// not hot paths.
    pub fn position_of(&self, id: RowId) -> Option<usize> {
        self.order.iter().position(|&r| r == id)
    }

    pub fn iter_in_order(&self) -> impl Iterator<Item = &Row> {
        self.order.iter().filter_map(move |id| self.rows.get(id))
    }

    fn check_cells(&self, cells: &BTreeMap<String, CellValue>) -> Result<(), StoreError> {
        for column in cells.keys() {
            if !self.schema.contains(column) {
                return Err(StoreError::UnknownColumn {
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    fn mint_row(&mut self, cells: BTreeMap<String, CellValue>) -> Row {
        let id = RowId(self.next_id);
        self.next_id += 1;
        let number = self.next_number;
        self.next_number += 1;
        Row { id, number, cells }
    }

    pub fn append(&mut self, cells: BTreeMap<String, CellValue>) -> Result<RowId, StoreError> {
        self.check_cells(&cells)?;
        let row = self.mint_row(cells);
        let id = row.id;
        self.rows.insert(id, row);
        self.order.push(id);
        Ok(id)
    }

    /// Insert at a position in canonical order. The new row still receives the
    /// next sequential row number; display numbering only becomes contiguous
    /// again after [`RowStore::compact_row_numbers`].
    pub fn insert_at(
        &mut self,
        index: usize,
        cells: BTreeMap<String, CellValue>,
    ) -> Result<RowId, StoreError> {
        if index > self.order.len() {
            return Err(StoreError::IndexOutOfBounds {
                index,
                len: self.order.len(),
            });
        }
        self.check_cells(&cells)?;
        let row = self.mint_row(cells);
        let id = row.id;
        self.rows.insert(id, row);
        self.order.insert(index, id);
        Ok(id)
    }

    /// Remove a single row. Returns `false` for an unknown id.
    pub fn remove(&mut self, id: RowId) -> bool {
        if self.rows.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|&r| r != id);
        true
    }

    /// Remove a batch, reporting a per-item outcome rather than failing as a
    /// whole.
    pub fn remove_batch(&mut self, ids: &[RowId]) -> Vec<(RowId, RemoveOutcome)> {
        let mut outcomes = Vec::with_capacity(ids.len());
        let mut removed_any = false;
        for &id in ids {
            if self.rows.remove(&id).is_some() {
                removed_any = true;
                outcomes.push((id, RemoveOutcome::Removed));
            } else {
                outcomes.push((id, RemoveOutcome::NotFound));
            }
        }
        if removed_any {
            let rows = &self.rows;
            self.order.retain(|id| rows.contains_key(id));
        }
        outcomes
    }

    /// All-or-nothing batch removal: if any id is unknown, nothing is removed.
    pub fn remove_batch_atomic(&mut self, ids: &[RowId]) -> Result<usize, StoreError> {
        for &id in ids {
            if !self.rows.contains_key(&id) {
                return Err(StoreError::RowNotFound { id });
            }
        }
        for &id in ids {
            self.rows.remove(&id);
        }
        let rows = &self.rows;
        self.order.retain(|id| rows.contains_key(id));
        Ok(ids.len())
    }

    /// Apply cell changes to one row. Returns `Ok(false)` for an unknown id;
    /// unknown columns are rejected before anything is written.
    pub fn update(
        &mut self,
        id: RowId,
        changes: BTreeMap<String, CellValue>,
    ) -> Result<bool, StoreError> {
        self.check_cells(&changes)?;
        let Some(row) = self.rows.get_mut(&id) else {
            return Ok(false);
        };
        for (column, value) in changes {
            row.cells.insert(column, value);
        }
        Ok(true)
    }

    /// Recompute display row numbers as a contiguous 1-based sequence in
    /// canonical order.
    pub fn compact_row_numbers(&mut self) {
        for (i, id) in self.order.iter().enumerate() {
            if let Some(row) = self.rows.get_mut(id) {
                row.number = i as u64 + 1;
            }
        }
        self.next_number = self.order.len() as u64 + 1;
    }
}
