//! Windowing over an ordered row sequence.
//!
//! Page numbers are 1-based. Requests past the last page succeed with an
//! empty page rather than erroring, so callers can clamp or redraw without a
//! separate bounds check; only a zero page size is a usage error.

use crate::error::PageError;
use datagrid_model::RowId;
use serde::Serialize;

/// One window of an ordered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page_number: usize,
    pub page_size: usize,
    /// Total rows in the underlying sequence, not in this page.
    pub total_rows: usize,
    pub rows: Vec<RowId>,
}

impl Page {
    pub fn total_pages(&self) -> usize {
        total_pages(self.total_rows, self.page_size)
    }

    pub fn is_last(&self) -> bool {
        self.page_number >= self.total_pages()
    }
}

pub(crate) fn total_pages(total_rows: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_rows.div_ceil(page_size)
}

/// Slice one page out of `ids`.
pub(crate) fn paginate(
    ids: &[RowId],
    page_number: usize,
    page_size: usize,
) -> Result<Page, PageError> {
    if page_size == 0 {
        return Err(PageError::InvalidPageSize);
    }
    // Page 0 is treated as page 1; out-of-range pages come back empty.
    let start = page_number
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(ids.len());
    let end = start.saturating_add(page_size).min(ids.len());
    Ok(Page {
        page_number: page_number.max(1),
        rows: ids[start..end].to_vec(),
        page_size,
        total_rows: ids.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(n: u64) -> Vec<RowId> {
        (1..=n).map(RowId).collect()
    }

    #[test]
    fn pages_are_one_based_and_sized() {
        let ids = ids(5);
        let page = paginate(&ids, 1, 2).unwrap();
        assert_eq!(page.rows, vec![RowId(1), RowId(2)]);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.is_last());

        let page = paginate(&ids, 3, 2).unwrap();
        assert_eq!(page.rows, vec![RowId(5)]);
        assert!(page.is_last());
    }

    #[test]
    fn out_of_range_page_is_empty_not_an_error() {
        let ids = ids(3);
        let page = paginate(&ids, 9, 2).unwrap();
        assert_eq!(page.rows, Vec::<RowId>::new());
        assert_eq!(page.total_rows, 3);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let err = paginate(&ids(3), 1, 0).unwrap_err();
        assert_eq!(err, PageError::InvalidPageSize);
    }

    #[test]
    fn empty_sequence_has_zero_pages() {
        let page = paginate(&[], 1, 10).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total_pages(), 0);
    }
}
