//! Per-dataset facade composing the store, view state, search, validation,
//! and events.
//!
//! All state lives in the `DataGrid` instance; nothing is process-wide, so
//! independent grids coexist and tests stay deterministic. Mutators take
//! `&mut self`, which makes single-writer a compile-time property. Reads take
//! `&self`; the filter/sort view state sits behind a `Mutex` so a read can
//! transparently rebuild a stale index, and concurrent readers serialize on
//! that one lock instead of racing the rebuild.

use crate::cancel::CancelToken;
use crate::error::{FilterError, PageError, SearchError, SortError, StoreError, ValidateError};
use crate::events::{EventBus, GridEvent, SubscriberId};
use crate::filter::{compile_criteria, CompiledCriterion, FilterIndex};
use crate::page::{paginate, Page};
use crate::search::{run_search, SearchMatch, SearchMode, SearchResultSet, SearchScope};
use crate::sort::CompiledSort;
use crate::store::{RemoveOutcome, RowStore};
use crate::validate::{
    BatchReport, RuleNode, SharedRule, ValidationConfig, ValidationContext, ValidationCoordinator,
    ValidationMode,
};
use datagrid_model::{
    CellValue, FilterCriterion, GridSchema, Row, RowId, RuleResult, SortDescriptor, SortScope,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Filter and sort state derived from the store.
///
/// `stale` marks every derived buffer invalid at once; the next read rebuilds
/// whatever the active criteria/sort configuration needs and clears it.
#[derive(Debug, Default)]
struct ViewState {
    criteria: Vec<FilterCriterion>,
    compiled: Vec<CompiledCriterion>,
    filtered: Option<FilterIndex>,
    /// Sort applied to the filtered view only; dropped with the filter.
    filtered_sort: Option<CompiledSort>,
    filtered_sort_descriptors: Vec<SortDescriptor>,
    /// Sort applied to the whole dataset, kept as a permutation buffer over
    /// the store's canonical order. Clearing it restores insertion order.
    canonical_sort: Option<CompiledSort>,
    canonical_sort_descriptors: Vec<SortDescriptor>,
    sorted_all: Option<Vec<RowId>>,
    stale: bool,
}

impl ViewState {
    fn has_filter(&self) -> bool {
        !self.criteria.is_empty()
    }

    /// Columns whose edits can change what this view shows.
    fn is_affected_by(&self, changed_columns: &BTreeMap<String, CellValue>) -> bool {
        let in_criteria = self
            .compiled
            .iter()
            .any(|c| changed_columns.contains_key(&c.column));
        let in_sort = self
            .canonical_sort_descriptors
            .iter()
            .chain(&self.filtered_sort_descriptors)
            .any(|d| changed_columns.contains_key(&d.column));
        in_criteria || in_sort
    }

    /// Bring every derived buffer up to date with the store.
    fn refresh(&mut self, store: &RowStore) {
        if !self.stale && self.buffers_present() {
            return;
        }
        if let Some(sort) = &self.canonical_sort {
            let mut ids = store.order().to_vec();
            sort.sort_ids(store, &mut ids);
            self.sorted_all = Some(ids);
        } else {
            self.sorted_all = None;
        }
        if self.has_filter() {
            let display = self.sorted_all.as_deref().unwrap_or(store.order());
            let mut index = FilterIndex::build(store, display, &self.compiled);
            if let Some(sort) = &self.filtered_sort {
                let mut ids = index.positions().to_vec();
                sort.sort_ids(store, &mut ids);
                index.reorder(ids);
            }
            self.filtered = Some(index);
        } else {
            self.filtered = None;
        }
        self.stale = false;
    }

    fn buffers_present(&self) -> bool {
        (self.canonical_sort.is_none() || self.sorted_all.is_some())
            && (!self.has_filter() || self.filtered.is_some())
    }

    /// Visible order of the whole dataset, ignoring the filter.
    fn display_order<'a>(&'a self, store: &'a RowStore) -> &'a [RowId] {
        self.sorted_all.as_deref().unwrap_or(store.order())
    }

    /// Visible order of the current view (filtered when a filter is active).
    fn visible_order<'a>(&'a self, store: &'a RowStore) -> &'a [RowId] {
        match &self.filtered {
            Some(index) => index.positions(),
            None => self.display_order(store),
        }
    }
}

/// One interactive grid dataset.
///
/// Composes the row store, the filtered/sorted view, the search cursor, the
/// validation coordinator, and the event bus. Edits addressed by a filtered
/// position must go through [`DataGrid::map_filtered_index_to_row_id`] first;
/// writing by raw position while a filter is active lands on the wrong row.
#[derive(Debug)]
pub struct DataGrid {
    store: RowStore,
    view: Mutex<ViewState>,
    validator: ValidationCoordinator,
    events: EventBus,
    current_search: Option<SearchResultSet>,
}

impl DataGrid {
    pub fn new(schema: GridSchema) -> Self {
        Self::with_validation_config(schema, ValidationConfig::default())
    }

    pub fn with_validation_config(schema: GridSchema, config: ValidationConfig) -> Self {
        Self {
            store: RowStore::new(schema),
            view: Mutex::new(ViewState::default()),
            validator: ValidationCoordinator::new(config),
            events: EventBus::new(),
            current_search: None,
        }
    }

    pub fn schema(&self) -> &GridSchema {
        self.store.schema()
    }

    pub fn store(&self) -> &RowStore {
        &self.store
    }

    pub fn validator(&self) -> &ValidationCoordinator {
        &self.validator
    }

    /// A panicked holder leaves the last committed view state behind; the
    /// next reader simply rebuilds from it.
    fn view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate_view(&mut self) {
        self.view().stale = true;
    }

    fn emit_row_count_changed(&self) {
        self.events.emit(&GridEvent::RowCountChanged {
            total: self.store.len(),
        });
        self.events.emit(&GridEvent::ViewInvalidated);
    }

    // ---- row mutation ----

    pub fn append(&mut self, cells: BTreeMap<String, CellValue>) -> Result<RowId, StoreError> {
        let id = self.store.append(cells)?;
        self.invalidate_view();
        self.emit_row_count_changed();
        Ok(id)
    }

    pub fn insert_at(
        &mut self,
        index: usize,
        cells: BTreeMap<String, CellValue>,
    ) -> Result<RowId, StoreError> {
        let id = self.store.insert_at(index, cells)?;
        self.invalidate_view();
        self.emit_row_count_changed();
        Ok(id)
    }

    /// Remove one row. Unknown ids are reported, not errors.
    pub fn remove(&mut self, id: RowId) -> bool {
        if !self.store.remove(id) {
            return false;
        }
        self.invalidate_view();
        self.emit_row_count_changed();
        true
    }

    pub fn remove_batch(&mut self, ids: &[RowId]) -> Vec<(RowId, RemoveOutcome)> {
        let outcomes = self.store.remove_batch(ids);
        if outcomes
            .iter()
            .any(|(_, outcome)| *outcome == RemoveOutcome::Removed)
        {
            self.invalidate_view();
            self.emit_row_count_changed();
        }
        outcomes
    }

    /// All-or-nothing batch removal.
    pub fn remove_batch_atomic(&mut self, ids: &[RowId]) -> Result<usize, StoreError> {
        let removed = self.store.remove_batch_atomic(ids)?;
        if removed > 0 {
            self.invalidate_view();
            self.emit_row_count_changed();
        }
        Ok(removed)
    }

    /// Apply cell changes to one row. Every committed edit notifies
    /// subscribers; the derived view is rebuilt only when a changed column
    /// participates in the active criteria or sort keys.
    pub fn update(
        &mut self,
        id: RowId,
        changes: BTreeMap<String, CellValue>,
    ) -> Result<bool, StoreError> {
        let affects_view = self.view().is_affected_by(&changes);
        let touched = self.store.update(id, changes)?;
        if touched {
            if affects_view {
                self.invalidate_view();
            }
            self.events.emit(&GridEvent::ViewInvalidated);
        }
        Ok(touched)
    }

    pub fn compact_row_numbers(&mut self) {
        self.store.compact_row_numbers();
    }

    // ---- filtering ----

    /// Replace the active criteria set (criteria AND together). The whole
    /// batch is validated first; on rejection the previous filter state is
    /// untouched. Returns the match count of the freshly built view.
    pub fn set_criteria(&mut self, criteria: Vec<FilterCriterion>) -> Result<usize, FilterError> {
        let compiled = compile_criteria(&criteria, self.store.schema())?;
        let count = {
            let mut view = self.view();
            view.criteria = criteria;
            view.compiled = compiled;
            view.stale = true;
            view.refresh(&self.store);
            view.filtered.as_ref().map_or(0, FilterIndex::len)
        };
        self.events.emit(&GridEvent::ViewInvalidated);
        Ok(count)
    }

    /// Drop the filter (and the filtered-view sort with it). A sort applied
    /// to the whole dataset survives.
    pub fn clear_criteria(&mut self) {
        {
            let mut view = self.view();
            view.criteria.clear();
            view.compiled.clear();
            view.filtered = None;
            view.filtered_sort = None;
            view.filtered_sort_descriptors.clear();
            view.stale = true;
        }
        self.events.emit(&GridEvent::ViewInvalidated);
    }

    pub fn criteria(&self) -> Vec<FilterCriterion> {
        self.view().criteria.clone()
    }

    // ---- sorting ----

    /// Apply a multi-key sort. Scope `All` reorders the whole dataset's view
    /// (the store's canonical order is never touched); `FilteredView` permutes
    /// only the filtered index and falls back to `All` when no filter is
    /// active, since the filtered view is then the whole dataset.
    pub fn sort(
        &mut self,
        descriptors: Vec<SortDescriptor>,
        scope: SortScope,
    ) -> Result<(), SortError> {
        let compiled = CompiledSort::compile(&descriptors, self.store.schema())?;
        {
            let mut view = self.view();
            let scope = match scope {
                SortScope::FilteredView if view.has_filter() => SortScope::FilteredView,
                _ => SortScope::All,
            };
            match scope {
                SortScope::All => {
                    view.canonical_sort = Some(compiled);
                    view.canonical_sort_descriptors = descriptors;
                }
                SortScope::FilteredView => {
                    view.filtered_sort = Some(compiled);
                    view.filtered_sort_descriptors = descriptors;
                }
            }
            view.stale = true;
        }
        self.events.emit(&GridEvent::ViewInvalidated);
        Ok(())
    }

    /// Clearing the `All` sort restores insertion order (row identities and
    /// numbers were never moved, only the permutation buffer is dropped).
    pub fn clear_sort(&mut self, scope: SortScope) {
        {
            let mut view = self.view();
            match scope {
                SortScope::All => {
                    view.canonical_sort = None;
                    view.canonical_sort_descriptors.clear();
                    view.sorted_all = None;
                }
                SortScope::FilteredView => {
                    view.filtered_sort = None;
                    view.filtered_sort_descriptors.clear();
                }
            }
            view.stale = true;
        }
        self.events.emit(&GridEvent::ViewInvalidated);
    }

    // ---- reading the composed view ----

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.store.get(id)
    }

    /// Row count of the current view (`only_filtered`) or the whole dataset.
    pub fn count(&self, only_filtered: bool) -> usize {
        if !only_filtered {
            return self.store.len();
        }
        let mut view = self.view();
        view.refresh(&self.store);
        view.visible_order(&self.store).len()
    }

    /// Ids in view order: filtered (and sorted) when `only_filtered`, the
    /// whole dataset's display order otherwise.
    pub fn get_all(&self, only_filtered: bool) -> Vec<RowId> {
        let mut view = self.view();
        view.refresh(&self.store);
        if only_filtered {
            view.visible_order(&self.store).to_vec()
        } else {
            view.display_order(&self.store).to_vec()
        }
    }

    /// One page of the composed (filtered, then sorted) view. Page numbers
    /// are 1-based; a page past the end comes back empty.
    pub fn get_page(&self, page_number: usize, page_size: usize) -> Result<Page, PageError> {
        self.get_paged(page_number, page_size, true)
    }

    /// Like [`DataGrid::get_page`], with an explicit choice between the
    /// filtered view and the whole dataset's display order.
    pub fn get_paged(
        &self,
        page_number: usize,
        page_size: usize,
        only_filtered: bool,
    ) -> Result<Page, PageError> {
        let mut view = self.view();
        view.refresh(&self.store);
        let ids = if only_filtered {
            view.visible_order(&self.store)
        } else {
            view.display_order(&self.store)
        };
        paginate(ids, page_number, page_size)
    }

    /// Translate a filtered position into the row identity a store write
    /// needs. With no filter active this indexes the full display order.
    pub fn map_filtered_index_to_row_id(&self, position: usize) -> Option<RowId> {
        let mut view = self.view();
        view.refresh(&self.store);
        view.visible_order(&self.store).get(position).copied()
    }

    pub fn map_row_id_to_filtered_index(&self, id: RowId) -> Option<usize> {
        let mut view = self.view();
        view.refresh(&self.store);
        match &view.filtered {
            Some(index) => index.position_of(id),
            None => view
                .display_order(&self.store)
                .iter()
                .position(|&r| r == id),
        }
    }

    // ---- search ----

    /// Run a search and install its result set as the navigable current one.
    ///
    /// An empty `columns` slice means every schema column. Columns are
    /// deduplicated and scanned in name order, which (with ascending row
    /// positions) makes the match order deterministic. Scope `Rows` ids are
    /// resolved to current view positions; ids no longer present are skipped.
    pub fn search(
        &mut self,
        query: &str,
        columns: &[String],
        mode: &SearchMode,
        scope: &SearchScope,
        cancel: Option<&CancelToken>,
    ) -> Result<&SearchResultSet, SearchError> {
        let schema = self.store.schema();
        let mut columns: Vec<String> = if columns.is_empty() {
            schema.columns().iter().map(|c| c.name.clone()).collect()
        } else {
            for column in columns {
                if !schema.contains(column) {
                    return Err(SearchError::UnknownColumn {
                        column: column.clone(),
                    });
                }
            }
            columns.to_vec()
        };
        columns.sort();
        columns.dedup();

        let scope_ids: Vec<RowId> = {
            let mut view = self.view();
            view.refresh(&self.store);
            match scope {
                SearchScope::All => view.display_order(&self.store).to_vec(),
                SearchScope::FilteredView => view.visible_order(&self.store).to_vec(),
                SearchScope::Rows(ids) => {
                    let order = view.visible_order(&self.store);
                    let mut positions: Vec<usize> = ids
                        .iter()
                        .filter_map(|id| order.iter().position(|r| r == id))
                        .collect();
                    positions.sort_unstable();
                    positions.dedup();
                    positions.into_iter().map(|p| order[p]).collect()
                }
            }
        };

        let results = run_search(&self.store, &scope_ids, &columns, query, mode, cancel)?;
        Ok(&*self.current_search.insert(results))
    }

    pub fn search_results(&self) -> Option<&SearchResultSet> {
        self.current_search.as_ref()
    }

    pub fn clear_search(&mut self) {
        self.current_search = None;
    }

    /// Step the search cursor forward, wrapping from the last match to the
    /// first. Matches whose row has been removed are pruned in passing.
    pub fn navigate_next(&mut self) -> Option<&SearchMatch> {
        let store = &self.store;
        self.current_search
            .as_mut()
            .and_then(|results| results.navigate_next(store))
    }

    /// Step the search cursor backward, wrapping from the first match to the
    /// last.
    pub fn navigate_previous(&mut self) -> Option<&SearchMatch> {
        let store = &self.store;
        self.current_search
            .as_mut()
            .and_then(|results| results.navigate_previous(store))
    }

    // ---- validation ----

    /// Mode decision for an editing operation over the current dataset.
    pub fn decide_validation_mode(&self, rule_count: usize) -> ValidationMode {
        self.validator.decide_mode(&ValidationContext {
            row_count: self.store.len(),
            rule_count,
        })
    }

    /// Validate one row against a flat rule list. `None` for an unknown id.
    pub fn validate_row(&self, id: RowId, rules: &[SharedRule]) -> Option<Vec<RuleResult>> {
        let row = self.store.get(id)?;
        let results = self.validator.validate_row(row, rules);
        self.events.emit(&GridEvent::ValidationResultsUpdated);
        Some(results)
    }

    /// Evaluate a rule tree against one row. `None` for an unknown id.
    pub fn validate_row_tree(&self, id: RowId, tree: &RuleNode) -> Option<(bool, Vec<RuleResult>)> {
        let row = self.store.get(id)?;
        let outcome = self.validator.validate_tree(row, tree);
        self.events.emit(&GridEvent::ValidationResultsUpdated);
        Some(outcome)
    }

    /// Bulk-validate every row in canonical order.
    pub fn validate_all(
        &self,
        rules: &[SharedRule],
        cancel: Option<&CancelToken>,
    ) -> Result<BatchReport, ValidateError> {
        let rows: Vec<Row> = self.store.iter_in_order().cloned().collect();
        let report = self.validator.validate_batch(&rows, rules, cancel)?;
        self.events.emit(&GridEvent::ValidationResultsUpdated);
        Ok(report)
    }

    // ---- events ----

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }
}
