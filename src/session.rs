//! The loaded dataset together with its view configuration and the derived
//! row sequence.
//!
//! Every mutating method applies its change, re-derives the rows when the
//! change can affect them and clamps the current page before returning, so
//! callers never see a page outside `1..=total_pages`.

use tracing::{debug, trace};

use crate::dataset::Dataset;
use crate::domain::BrowseError;
use crate::exporter;
use crate::paginator::{self, Page, PageItem};
use crate::query;
use crate::view::{Shift, SortSpec, ViewConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    pub total_rows: usize,
    pub displayed_rows: usize,
    pub columns: usize,
}

pub struct Session {
    dataset: Dataset,
    config: ViewConfig,
    derived: Vec<usize>,
    default_page_size: usize,
}

impl Session {
    pub fn new(default_page_size: usize) -> Self {
        let dataset = Dataset::empty();
        let config = ViewConfig::defaults(dataset.fields(), default_page_size);
        Session {
            dataset,
            config,
            derived: Vec::new(),
            default_page_size: default_page_size.max(1),
        }
    }

    /// Replaces the dataset and resets the view to its defaults.
    pub fn load(&mut self, dataset: Dataset) {
        debug!(
            "Loading dataset \"{}\" with {} rows and {} columns",
            dataset.name(),
            dataset.len(),
            dataset.fields().len()
        );
        self.config = ViewConfig::defaults(dataset.fields(), self.default_page_size);
        self.dataset = dataset;
        self.refresh();
    }

    pub fn clear(&mut self) {
        self.load(Dataset::empty());
    }

    pub fn is_loaded(&self) -> bool {
        !self.dataset.fields().is_empty()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Rows after search, filters and sorting, before paging.
    pub fn derived_rows(&self) -> &[usize] {
        &self.derived
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            total_rows: self.dataset.len(),
            displayed_rows: self.derived.len(),
            columns: self.dataset.fields().len(),
        }
    }

    pub fn total_pages(&self) -> usize {
        paginator::total_pages(self.derived.len(), self.config.page_size())
    }

    pub fn page(&self) -> Page<'_> {
        paginator::paginate(
            &self.derived,
            self.config.page_size(),
            self.config.current_page(),
        )
    }

    pub fn page_numbers(&self) -> Vec<PageItem> {
        paginator::page_numbers(self.total_pages(), self.config.current_page())
    }

    pub fn export(&self) -> Result<Option<String>, BrowseError> {
        exporter::export(
            &self.dataset,
            &self.derived,
            self.config.visible_columns(),
        )
    }

    // ----------------------------- Row affecting ----------------------------- //

    pub fn set_search_term(&mut self, term: &str) {
        self.config.set_search_term(term);
        self.refresh();
    }

    pub fn set_column_filter(&mut self, field: &str, value: &str) {
        self.config.set_column_filter(field, value);
        self.config.set_current_page(1);
        self.refresh();
    }

    pub fn remove_filter(&mut self, field: &str) {
        self.config.remove_filter(field);
        self.config.set_current_page(1);
        self.refresh();
    }

    /// Drops every column filter and the search term.
    pub fn clear_all_filters(&mut self) {
        self.config.clear_filters();
        self.config.set_current_page(1);
        self.refresh();
    }

    pub fn sort_by(&mut self, field: &str) {
        self.config.sort_by(field);
        self.refresh();
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.config.set_sort(sort);
        self.refresh();
    }

    pub fn clear_sort(&mut self) {
        self.config.set_sort(SortSpec::default());
        self.refresh();
    }

    // -------------------------------- Columns -------------------------------- //

    pub fn toggle_column(&mut self, field: &str) {
        self.config.toggle_column(self.dataset.fields(), field);
    }

    pub fn toggle_all_columns(&mut self, visible: bool) {
        self.config.toggle_all_columns(self.dataset.fields(), visible);
    }

    pub fn reorder_columns(&mut self, order: Vec<String>) -> bool {
        self.config.reorder_columns(self.dataset.fields(), order)
    }

    pub fn move_column(&mut self, field: &str, shift: Shift) -> bool {
        self.config.move_column(self.dataset.fields(), field, shift)
    }

    // --------------------------------- Paging -------------------------------- //

    pub fn set_page_size(&mut self, page_size: usize) {
        self.config.set_page_size(page_size);
        self.clamp_page();
    }

    pub fn set_page(&mut self, page: usize) {
        self.config.set_current_page(page);
        self.clamp_page();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.config.current_page() + 1);
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.config.current_page().saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.set_page(1);
    }

    pub fn last_page(&mut self) {
        self.set_page(self.total_pages());
    }

    fn refresh(&mut self) {
        self.derived = query::derive(&self.dataset, &self.config);
        self.clamp_page();
    }

    fn clamp_page(&mut self) {
        let total = self.total_pages();
        self.config.clamp_page(total);
        trace!(
            "Page {}/{} ({} rows per page, {} rows)",
            self.config.current_page(),
            total,
            self.config.page_size(),
            self.derived.len()
        );
    }
}
