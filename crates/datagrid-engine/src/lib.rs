#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! Row store and query-coordination engine for interactive data grids.
//!
//! The engine owns a large mutable collection of rows and layers derived,
//! rebuildable projections on top of it: a filtered-view index, multi-key sort
//! orderings, navigable search results, a validation-mode decision engine, and
//! paginated windows over the composed (filtered → sorted) view.
//!
//! [`DataGrid`] is the per-dataset entry point. It bundles the row store, the
//! current filter/sort view state, the validation coordinator, and a change
//! notification bus; no state is process-wide, so independent datasets (and
//! deterministic tests) coexist freely.
//!
//! Derived structures hold only [`RowId`](datagrid_model::RowId)s or
//! positions, never copies of cell data. Any edit addressed by a filtered
//! position must resolve through [`DataGrid::map_filtered_index_to_row_id`]
//! before touching the store, otherwise the write can land on the wrong row
//! while a filter is active.

pub mod cancel;
pub mod error;
pub mod events;
pub mod filter;
pub mod page;
pub mod search;
pub mod sort;
pub mod store;
pub mod validate;

mod compare;
mod grid;
mod parallel;

pub use cancel::CancelToken;
pub use error::{
    CriterionIssue, FilterError, PageError, SearchError, SortError, StoreError, ValidateError,
};
pub use events::{EventBus, GridEvent, SubscriberId};
pub use filter::FilterIndex;
pub use grid::DataGrid;
pub use page::Page;
pub use search::{SearchMatch, SearchMode, SearchResultSet, SearchScope};
pub use store::{RemoveOutcome, RowStore};
pub use validate::{
    BatchReport, RuleNode, RuleStats, SharedRule, ValidationConfig, ValidationContext,
    ValidationCoordinator, ValidationMode, ValidationRule,
};
