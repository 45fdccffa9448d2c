//! Type-aware value coercion and comparison shared by filtering, sorting, and
//! search. The column schema decides the comparison domain; runtime values are
//! coerced into it or treated as incomparable.

use chrono::NaiveDateTime;
use datagrid_model::{CellValue, ColumnType};
use std::borrow::Cow;
use std::cmp::Ordering;

/// Text rendering used for text-domain comparison and search matching.
pub(crate) fn cell_to_text(cell: &CellValue) -> Cow<'_, str> {
    match cell {
        CellValue::Null => Cow::Borrowed(""),
        CellValue::Number(n) => Cow::Owned(format_number(*n)),
        CellValue::Text(s) => Cow::Borrowed(s),
        CellValue::Bool(true) => Cow::Borrowed("true"),
        CellValue::Bool(false) => Cow::Borrowed("false"),
        CellValue::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

fn format_number(n: f64) -> String {
    // Normalize negative zero so display and text matching are stable.
    if n == 0.0 {
        return "0".to_string();
    }
    format!("{n}")
}

pub(crate) fn coerce_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if !n.is_nan() => Some(*n),
        CellValue::Number(_) => None,
        CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
        CellValue::DateTime(_) | CellValue::Null => None,
    }
}

pub(crate) fn coerce_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Text(s) => parse_text_datetime(s.trim()),
        _ => None,
    }
}

fn parse_text_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub(crate) fn coerce_bool(cell: &CellValue) -> Option<bool> {
    match cell {
        CellValue::Bool(b) => Some(*b),
        CellValue::Number(n) => Some(*n != 0.0),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Whether a cell carries a value that participates in ordered comparison
/// within the column's domain. Nulls and values that fail coercion (a text
/// cell in a number column, NaN) do not.
pub(crate) fn is_orderable(cell: &CellValue, ty: ColumnType) -> bool {
    match ty {
        ColumnType::Number => coerce_number(cell).is_some(),
        ColumnType::DateTime => coerce_datetime(cell).is_some(),
        ColumnType::Bool => coerce_bool(cell).is_some(),
        ColumnType::Text => !cell.is_null(),
    }
}

/// Compare two cells within a column's declared type domain.
///
/// Returns `None` when either side cannot be coerced into the domain (the
/// caller decides how incomparable values rank; filters fail the criterion,
/// sorting groups them with nulls).
pub(crate) fn compare_typed(
    a: &CellValue,
    b: &CellValue,
    ty: ColumnType,
    case_sensitive: bool,
) -> Option<Ordering> {
    match ty {
        ColumnType::Number => {
            let (a, b) = (coerce_number(a)?, coerce_number(b)?);
            a.partial_cmp(&b)
        }
        ColumnType::DateTime => Some(coerce_datetime(a)?.cmp(&coerce_datetime(b)?)),
        ColumnType::Bool => Some(coerce_bool(a)?.cmp(&coerce_bool(b)?)),
        ColumnType::Text => {
            let (a, b) = (cell_to_text(a), cell_to_text(b));
            Some(compare_text(&a, &b, case_sensitive))
        }
    }
}

fn compare_text(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        return a.cmp(b);
    }
    if a.is_ascii() && b.is_ascii() {
        let folded = a
            .bytes()
            .map(|c| c.to_ascii_lowercase())
            .cmp(b.bytes().map(|c| c.to_ascii_lowercase()));
        return folded.then_with(|| a.cmp(b));
    }
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub(crate) fn text_eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else if a.is_ascii() && b.is_ascii() {
        a.eq_ignore_ascii_case(b)
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

pub(crate) fn text_contains(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return haystack.contains(needle);
    }
    if haystack.is_ascii() && needle.is_ascii() {
        return ascii_contains_case_insensitive(haystack, needle);
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn text_starts_with(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return haystack.starts_with(needle);
    }
    if haystack.is_ascii() && needle.is_ascii() {
        return ascii_starts_with_case_insensitive(haystack, needle);
    }
    haystack.to_lowercase().starts_with(&needle.to_lowercase())
}

pub(crate) fn text_ends_with(haystack: &str, needle: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return haystack.ends_with(needle);
    }
    if haystack.is_ascii() && needle.is_ascii() {
        return ascii_ends_with_case_insensitive(haystack, needle);
    }
    haystack.to_lowercase().ends_with(&needle.to_lowercase())
}

fn ascii_contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    for i in 0..=haystack.len() - needle.len() {
        if haystack[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            return true;
        }
    }
    false
}

fn ascii_starts_with_case_insensitive(haystack: &str, needle: &str) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack[..needle.len()].eq_ignore_ascii_case(needle)
}

fn ascii_ends_with_case_insensitive(haystack: &str, needle: &str) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack[haystack.len() - needle.len()..].eq_ignore_ascii_case(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_coerce_from_text_and_bool() {
        assert_eq!(coerce_number(&CellValue::Text(" 1.5 ".into())), Some(1.5));
        assert_eq!(coerce_number(&CellValue::Bool(true)), Some(1.0));
        assert_eq!(coerce_number(&CellValue::Text("abc".into())), None);
        assert_eq!(coerce_number(&CellValue::Null), None);
    }

    #[test]
    fn datetimes_coerce_from_date_only_text() {
        let dt = coerce_datetime(&CellValue::Text("2024-03-01".into())).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-01 00:00:00");
    }

    #[test]
    fn text_comparison_is_case_insensitive_by_default() {
        assert_eq!(
            compare_typed(
                &CellValue::Text("Alpha".into()),
                &CellValue::Text("alpha".into()),
                ColumnType::Text,
                false,
            ),
            Some(Ordering::Less),
        );
        assert!(text_eq("Alpha", "alpha", false));
        assert!(!text_eq("Alpha", "alpha", true));
    }

    #[test]
    fn ascii_substring_matching_ignores_case() {
        assert!(text_contains("Hello World", "WORLD", false));
        assert!(text_starts_with("Hello", "he", false));
        assert!(text_ends_with("Hello", "LO", false));
        assert!(!text_contains("Hello", "xyz", false));
    }

    #[test]
    fn number_text_rendering_normalizes_negative_zero() {
        assert_eq!(cell_to_text(&CellValue::Number(-0.0)), "0");
        assert_eq!(cell_to_text(&CellValue::Number(30.0)), "30");
    }

    #[test]
    fn nan_is_never_comparable() {
        assert_eq!(
            compare_typed(
                &CellValue::Number(f64::NAN),
                &CellValue::Number(1.0),
                ColumnType::Number,
                false,
            ),
            None,
        );
    }
}
