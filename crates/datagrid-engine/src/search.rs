//! Scoped text/pattern search with a navigable, circular match cursor.
//!
//! Matches are collected in deterministic order (ascending view position,
//! then column name) regardless of whether the scan ran sequentially or in
//! parallel chunks. The result set is immutable except for its cursor and for
//! lazy pruning of matches whose row has since been removed; a row that still
//! exists but no longer satisfies the predicate stays in the set until the
//! next explicit search.

use crate::cancel::CancelToken;
use crate::compare::{cell_to_text, text_contains, text_ends_with, text_eq, text_starts_with};
use crate::error::SearchError;
use crate::store::RowStore;
use datagrid_model::RowId;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How candidate text is matched against the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Contains,
    Exact,
    StartsWith,
    EndsWith,
    /// Pattern match, case-insensitive unless flagged (mirrors the filter
    /// criterion's regex knob).
    Regex {
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Normalized similarity in `[0, 1]`; a cell matches when its similarity
    /// to the query reaches the threshold.
    Fuzzy { threshold: f64 },
}

/// Candidate rows a search operates over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    All,
    FilteredView,
    /// Externally supplied subset (e.g. the current selection). Ids not
    /// present in the store are skipped.
    Rows(Vec<RowId>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub row_id: RowId,
    /// Position of the row within the searched scope at search time.
    pub row_index: usize,
    pub column: String,
    pub matched_value: String,
    pub score: f64,
}

/// Candidate scopes above this size are scanned in parallel chunks.
const PARALLEL_THRESHOLD: usize = 1_000;
const CHUNK_ROWS: usize = 256;

#[derive(Debug, Clone)]
enum CompiledMatcher {
    Contains(String),
    Exact(String),
    StartsWith(String),
    EndsWith(String),
    Regex(Regex),
    Fuzzy { query: String, threshold: f64 },
}

impl CompiledMatcher {
    fn compile(query: &str, mode: &SearchMode) -> Result<Self, SearchError> {
        Ok(match mode {
            SearchMode::Contains => Self::Contains(query.to_string()),
            SearchMode::Exact => Self::Exact(query.to_string()),
            SearchMode::StartsWith => Self::StartsWith(query.to_string()),
            SearchMode::EndsWith => Self::EndsWith(query.to_string()),
            SearchMode::Regex { case_sensitive } => {
                let built = if *case_sensitive {
                    Regex::new(query)
                } else {
                    Regex::new(&format!("(?i){query}"))
                };
                Self::Regex(built.map_err(|e| SearchError::InvalidPattern {
                    reason: e.to_string(),
                })?)
            }
            SearchMode::Fuzzy { threshold } => {
                if !(0.0..=1.0).contains(threshold) {
                    return Err(SearchError::InvalidThreshold {
                        threshold: *threshold,
                    });
                }
                Self::Fuzzy {
                    query: query.to_lowercase(),
                    threshold: *threshold,
                }
            }
        })
    }

    /// Score the candidate text: `None` means no match, `Some(score)` is the
    /// match score (1.0 for the exact-style modes).
    fn score(&self, text: &str) -> Option<f64> {
        match self {
            Self::Contains(q) => text_contains(text, q, false).then_some(1.0),
            Self::Exact(q) => text_eq(text, q, false).then_some(1.0),
            Self::StartsWith(q) => text_starts_with(text, q, false).then_some(1.0),
            Self::EndsWith(q) => text_ends_with(text, q, false).then_some(1.0),
            Self::Regex(re) => re.is_match(text).then_some(1.0),
            Self::Fuzzy { query, threshold } => {
                let score = similarity(&text.to_lowercase(), query);
                (score >= *threshold).then_some(score)
            }
        }
    }
}

/// Normalized Levenshtein similarity: `1 - distance / max_len`, in `[0, 1]`.
fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    let distance = levenshtein(&a, &b);
    1.0 - distance as f64 / max_len as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

fn scan_chunk(
    store: &RowStore,
    ids: &[RowId],
    index_offset: usize,
    columns: &[String],
    matcher: &CompiledMatcher,
) -> Vec<SearchMatch> {
    let mut matches = Vec::new();
    for (offset, &id) in ids.iter().enumerate() {
        let Some(row) = store.get(id) else { continue };
        for column in columns {
            let text = cell_to_text(row.cell(column));
            if let Some(score) = matcher.score(&text) {
                matches.push(SearchMatch {
                    row_id: id,
                    row_index: index_offset + offset,
                    column: column.clone(),
                    matched_value: text.into_owned(),
                    score,
                });
            }
        }
    }
    matches
}

/// Scan `scope_ids` (already resolved to view order) for matches.
///
/// `columns` must already be validated against the schema and sorted by name;
/// that, plus in-order chunk merging, keeps the result order deterministic.
pub(crate) fn run_search(
    store: &RowStore,
    scope_ids: &[RowId],
    columns: &[String],
    query: &str,
    mode: &SearchMode,
    cancel: Option<&CancelToken>,
) -> Result<SearchResultSet, SearchError> {
    let matcher = CompiledMatcher::compile(query, mode)?;

    let matches = if scope_ids.len() > PARALLEL_THRESHOLD {
        scan_parallel(store, scope_ids, columns, &matcher, cancel)?
    } else {
        scan_sequential(store, scope_ids, columns, &matcher, cancel)?
    };

    Ok(SearchResultSet {
        matches,
        cursor: None,
    })
}

fn scan_sequential(
    store: &RowStore,
    scope_ids: &[RowId],
    columns: &[String],
    matcher: &CompiledMatcher,
    cancel: Option<&CancelToken>,
) -> Result<Vec<SearchMatch>, SearchError> {
    let mut matches = Vec::new();
    for (chunk_idx, chunk) in scope_ids.chunks(CHUNK_ROWS).enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(SearchError::Cancelled);
        }
        matches.extend(scan_chunk(
            store,
            chunk,
            chunk_idx * CHUNK_ROWS,
            columns,
            matcher,
        ));
    }
    Ok(matches)
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn scan_parallel(
    store: &RowStore,
    scope_ids: &[RowId],
    columns: &[String],
    matcher: &CompiledMatcher,
    cancel: Option<&CancelToken>,
) -> Result<Vec<SearchMatch>, SearchError> {
    use rayon::prelude::*;

    let Some(pool) = crate::parallel::pool() else {
        return scan_sequential(store, scope_ids, columns, matcher, cancel);
    };

    let chunks: Vec<(usize, &[RowId])> = scope_ids
        .chunks(CHUNK_ROWS)
        .enumerate()
        .map(|(i, chunk)| (i * CHUNK_ROWS, chunk))
        .collect();

    let per_chunk: Result<Vec<Vec<SearchMatch>>, SearchError> = pool.install(|| {
        chunks
            .par_iter()
            .map(|&(offset, chunk)| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(SearchError::Cancelled);
                }
                Ok(scan_chunk(store, chunk, offset, columns, matcher))
            })
            .collect()
    });

    // Chunks come back in submission order, so concatenation preserves the
    // deterministic row-position ordering.
    Ok(per_chunk?.into_iter().flatten().collect())
}

#[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
fn scan_parallel(
    store: &RowStore,
    scope_ids: &[RowId],
    columns: &[String],
    matcher: &CompiledMatcher,
    cancel: Option<&CancelToken>,
) -> Result<Vec<SearchMatch>, SearchError> {
    scan_sequential(store, scope_ids, columns, matcher, cancel)
}

/// An ordered, immutable match sequence plus a mutable circular cursor.
///
/// A fresh search leaves the cursor "before first": no match is current until
/// the first navigation call.
#[derive(Debug, Clone, Default)]
pub struct SearchResultSet {
    matches: Vec<SearchMatch>,
    cursor: Option<usize>,
}

impl SearchResultSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.cursor.and_then(|i| self.matches.get(i))
    }

    /// Advance with circular wraparound (last → first).
    pub fn navigate_next(&mut self, store: &RowStore) -> Option<&SearchMatch> {
        self.navigate(store, true)
    }

    /// Retreat with circular wraparound (first → last).
    pub fn navigate_previous(&mut self, store: &RowStore) -> Option<&SearchMatch> {
        self.navigate(store, false)
    }

    /// Matches whose row has been removed are pruned here, the first time
    /// navigation touches them.
    fn navigate(&mut self, store: &RowStore, forward: bool) -> Option<&SearchMatch> {
        loop {
            if self.matches.is_empty() {
                self.cursor = None;
                return None;
            }
            let len = self.matches.len();
            let candidate = match (self.cursor, forward) {
                (None, true) => 0,
                (None, false) => len - 1,
                (Some(i), true) => (i + 1) % len,
                (Some(i), false) => (i + len - 1) % len,
            };
            if store.contains(self.matches[candidate].row_id) {
                self.cursor = Some(candidate);
                return self.matches.get(candidate);
            }
            self.matches.remove(candidate);
            if let Some(i) = self.cursor {
                if i == candidate {
                    self.cursor = None;
                } else if i > candidate {
                    self.cursor = Some(i - 1);
                }
            }
        }
    }
}
