//! Pure table operations: filter, sort, paginate and sort toggling.
//!
//! Every function here borrows its input and returns references or slices,
//! so the dataset's rows are never moved or mutated.

use crate::types::{Row, SortOrder, parse_number};
use std::cmp::Ordering;

/// Keep rows where any cell's text contains `term` (case-insensitive).
///
/// An empty term keeps every row in the original order.
pub fn filter_rows<'a>(rows: &'a [Row], term: &str) -> Vec<&'a Row> {
    if term.is_empty() {
        return rows.iter().collect();
    }
    let needle = term.to_lowercase();
    rows.iter()
        .filter(|row| row.cells().iter().any(|cell| cell.to_string().to_lowercase().contains(&needle)))
        .collect()
}

/// Comparison key for one cell
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn for_cell(row: &Row, column: usize) -> Self {
        let text = row.get(column).map(|c| c.to_string()).unwrap_or_default();
        match parse_number(&text) {
            Some(n) if !n.is_nan() => SortKey::Number(n),
            _ => SortKey::Text(text.to_lowercase()),
        }
    }

    /// Numbers order before text; within a kind, natural order
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

/// Stable sort of row references by one column.
///
/// `None` returns the rows in their input order. A column index past the end
/// of a row reads as empty text.
pub fn sort_rows<'a>(rows: &[&'a Row], column: Option<usize>, order: SortOrder) -> Vec<&'a Row> {
    let Some(column) = column else {
        return rows.to_vec();
    };

    let mut keyed: Vec<(SortKey, &'a Row)> = rows.iter().map(|row| (SortKey::for_cell(row, column), *row)).collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let cmp = a.compare(b);
        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });
    keyed.into_iter().map(|(_, row)| row).collect()
}

/// Number of pages needed for `count` items; 0 for an empty list
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// The 1-based `page` of `items`, clipped to the list.
///
/// Pages past the end (or page 0) come back empty.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Result of clicking a column header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortTransition {
    pub column: String,
    pub order: SortOrder,
    /// Always set: any sort change returns the view to the first page
    pub reset_page: bool,
}

/// Same column flips the order; a different column sorts ascending
pub fn toggle_sort(current_column: Option<&str>, current_order: SortOrder, clicked: &str) -> SortTransition {
    let order = match current_column {
        Some(current) if current == clicked => current_order.flipped(),
        _ => SortOrder::Asc,
    };
    SortTransition { column: clicked.to_string(), order, reset_page: true }
}
