//! The stateful table view.
//!
//! `TableView` owns a dataset snapshot and the current view preferences.
//! Each read re-derives filter, sort and paginate from those two; nothing
//! derived is cached. Sort and page-size changes are published to the
//! preference store without waiting for it.

use super::engine::{self, filter_rows, paginate, sort_rows, total_pages};
use super::export::{download_csv, export_csv};
use crate::prefs::PreferencePublisher;
use crate::save::FileSaver;
use crate::types::{Dataset, PreferenceUpdate, Row, SortOrder, StoredPreferences, ViewPreferences};
use log::debug;

/// One rendered page of the view
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub rows: Vec<&'a Row>,
    pub columns: &'a [String],
    /// 1-based; 1 even when there are no rows
    pub page: usize,
    /// 0 when the filtered set is empty
    pub total_pages: usize,
    /// Rows matching the search term
    pub total_count: usize,
    /// Rows in the dataset before filtering
    pub dataset_count: usize,
    /// Sorted column index and direction, if a sort is active
    pub sort: Option<(usize, SortOrder)>,
}

pub struct TableView {
    dataset: Dataset,
    prefs: ViewPreferences,
    publisher: PreferencePublisher,
}

impl TableView {
    /// Start a view from persisted preferences, or defaults when there are none
    pub fn new(dataset: Dataset, stored: Option<StoredPreferences>, publisher: PreferencePublisher) -> Self {
        let prefs = ViewPreferences::from_stored(stored.as_ref());
        debug!(
            "opening view of '{}' ({} rows) sort={:?} {} per page",
            dataset.name(),
            dataset.len(),
            prefs.sort_column,
            prefs.items_per_page
        );
        Self { dataset, prefs, publisher }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn preferences(&self) -> &ViewPreferences {
        &self.prefs
    }

    /// Swap in a new dataset; filter and sort settings carry over
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        self.prefs.current_page = 1;
    }

    pub fn set_search(&mut self, term: &str) {
        self.prefs.search_term = term.to_string();
        self.prefs.current_page = 1;
    }

    /// Header click: flip the order on the sorted column, otherwise sort ascending
    pub fn toggle_sort(&mut self, column: &str) {
        let transition = engine::toggle_sort(self.prefs.sort_column.as_deref(), self.prefs.sort_order, column);
        self.apply_sort(transition.column, transition.order);
        if transition.reset_page {
            self.prefs.current_page = 1;
        }
    }

    pub fn set_sort(&mut self, column: &str, order: SortOrder) {
        self.apply_sort(column.to_string(), order);
        self.prefs.current_page = 1;
    }

    fn apply_sort(&mut self, column: String, order: SortOrder) {
        self.publisher.publish(PreferenceUpdate::sort(&column, order));
        self.prefs.sort_column = Some(column);
        self.prefs.sort_order = order;
    }

    pub fn set_items_per_page(&mut self, n: usize) -> Result<(), String> {
        if n == 0 {
            return Err("Items per page must be at least 1".to_string());
        }
        self.prefs.items_per_page = n;
        self.prefs.current_page = 1;
        self.publisher.publish(PreferenceUpdate::items_per_page(n));
        Ok(())
    }

    /// Pages available for the current filter, never less than 1
    fn last_page(&self) -> usize {
        let count = filter_rows(self.dataset.rows(), &self.prefs.search_term).len();
        total_pages(count, self.prefs.items_per_page).max(1)
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.prefs.current_page = page.clamp(1, self.last_page());
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.prefs.current_page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.prefs.current_page.saturating_sub(1));
    }

    fn sort_index(&self) -> Option<usize> {
        self.prefs.sort_column.as_deref().and_then(|c| self.dataset.column_index(c))
    }

    /// Filtered and sorted rows, all pages
    pub fn ordered_rows(&self) -> Vec<&Row> {
        let filtered = filter_rows(self.dataset.rows(), &self.prefs.search_term);
        sort_rows(&filtered, self.sort_index(), self.prefs.sort_order)
    }

    pub fn visible_page(&self) -> PageView<'_> {
        let ordered = self.ordered_rows();
        let total_count = ordered.len();
        let rows = paginate(&ordered, self.prefs.current_page, self.prefs.items_per_page).to_vec();
        PageView {
            rows,
            columns: self.dataset.columns(),
            page: self.prefs.current_page,
            total_pages: total_pages(total_count, self.prefs.items_per_page),
            total_count,
            dataset_count: self.dataset.len(),
            sort: self.sort_index().map(|idx| (idx, self.prefs.sort_order)),
        }
    }

    /// CSV of every filtered, sorted row (not just the visible page)
    pub fn export_csv(&self) -> String {
        export_csv(&self.ordered_rows(), self.dataset.columns())
    }

    /// Save the export through `saver`
    pub fn download_csv(&self, saver: &dyn FileSaver) -> std::io::Result<std::path::PathBuf> {
        download_csv(&self.export_csv(), self.dataset.name(), saver)
    }

    /// Stop publishing and wait for queued preference writes
    pub fn close(self) -> crate::prefs::PublishSummary {
        self.publisher.finish()
    }
}
