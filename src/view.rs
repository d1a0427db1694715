use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Orients an ascending comparison. Equal stays equal, keeping sorts stable.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    field: String, // Empty means unsorted
    direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        SortSpec {
            field: field.into(),
            direction,
        }
    }

    pub fn field(&self) -> Option<&str> {
        if self.field.is_empty() {
            None
        } else {
            Some(&self.field)
        }
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Left,
    Right,
}

/// User controlled display parameters of the loaded dataset.
///
/// Operations that change the number of derived rows go through
/// [`crate::session::Session`], which re-derives and clamps the page in the
/// same call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    search_term: String,
    column_filters: BTreeMap<String, String>,
    sort: SortSpec,
    visible_columns: Vec<String>,
    page_size: usize,
    current_page: usize,
}

impl ViewConfig {
    /// Empty search, no filters, unsorted, every field visible in source order, first page.
    pub fn defaults(fields: &[String], page_size: usize) -> Self {
        ViewConfig {
            search_term: String::new(),
            column_filters: BTreeMap::new(),
            sort: SortSpec::default(),
            visible_columns: fields.to_vec(),
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn column_filters(&self) -> &BTreeMap<String, String> {
        &self.column_filters
    }

    pub fn filter_value(&self, field: &str) -> Option<&str> {
        self.column_filters.get(field).map(String::as_str)
    }

    /// Filters with a non blank value, ordered by field id.
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.column_filters
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(field, value)| (field.as_str(), value.as_str()))
    }

    pub fn active_filter_count(&self) -> usize {
        self.active_filters().count()
    }

    pub fn set_column_filter(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.column_filters.insert(field.into(), value.into());
    }

    pub fn remove_filter(&mut self, field: &str) -> bool {
        self.column_filters.remove(field).is_some()
    }

    pub fn clear_filters(&mut self) {
        self.column_filters.clear();
        self.search_term.clear();
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    /// Sorting the sorted field again flips the direction, a new field starts ascending.
    pub fn sort_by(&mut self, field: &str) {
        self.sort = if self.sort.field() == Some(field) {
            SortSpec::new(field, self.sort.direction.toggled())
        } else {
            SortSpec::new(field, SortDirection::Ascending)
        };
    }

    pub fn visible_columns(&self) -> &[String] {
        &self.visible_columns
    }

    pub fn is_visible(&self, field: &str) -> bool {
        self.visible_columns.iter().any(|c| c == field)
    }

    /// Hides a visible field or appends a hidden one at the end.
    pub fn toggle_column(&mut self, fields: &[String], field: &str) {
        if !fields.iter().any(|f| f == field) {
            debug!("Ignoring visibility toggle of unknown column \"{field}\"");
            return;
        }
        if self.is_visible(field) {
            self.visible_columns.retain(|c| c != field);
        } else {
            self.visible_columns.push(field.to_string());
        }
        trace!("Visible columns: {:?}", self.visible_columns);
    }

    pub fn toggle_all_columns(&mut self, fields: &[String], visible: bool) {
        self.visible_columns = if visible { fields.to_vec() } else { Vec::new() };
    }

    /// Replaces the visible columns. Lists naming unknown fields or holding
    /// duplicates are ignored and the current order is kept.
    pub fn reorder_columns(&mut self, fields: &[String], order: Vec<String>) -> bool {
        let known = order.iter().all(|c| fields.contains(c));
        let unique = order
            .iter()
            .enumerate()
            .all(|(idx, c)| !order[..idx].contains(c));
        if known && unique {
            self.visible_columns = order;
            true
        } else {
            debug!("Rejected column order {order:?}");
            false
        }
    }

    /// Swaps a visible column with its neighbour.
    pub fn move_column(&mut self, fields: &[String], field: &str, shift: Shift) -> bool {
        let Some(pos) = self.visible_columns.iter().position(|c| c == field) else {
            return false;
        };
        let target = match shift {
            Shift::Left if pos > 0 => pos - 1,
            Shift::Right if pos + 1 < self.visible_columns.len() => pos + 1,
            _ => return false,
        };
        let mut order = self.visible_columns.clone();
        order.swap(pos, target);
        self.reorder_columns(fields, order)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            debug!("Ignoring page size 0");
            return;
        }
        self.page_size = page_size;
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_current_page(&mut self, page: usize) {
        self.current_page = page;
    }

    /// Keeps the current page within `1..=total_pages`.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.current_page = self.current_page.clamp(1, total_pages.max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn toggled_column_is_appended_at_the_end() {
        let fields = fields();
        let mut cfg = ViewConfig::defaults(&fields, 10);
        cfg.toggle_column(&fields, "a");
        assert_eq!(cfg.visible_columns(), ["b", "c"]);
        cfg.toggle_column(&fields, "a");
        assert_eq!(cfg.visible_columns(), ["b", "c", "a"]);
    }

    #[test]
    fn toggle_unknown_column_is_ignored() {
        let fields = fields();
        let mut cfg = ViewConfig::defaults(&fields, 10);
        cfg.toggle_column(&fields, "zzz");
        assert_eq!(cfg.visible_columns(), ["a", "b", "c"]);
    }

    #[test]
    fn toggle_all_uses_source_order() {
        let fields = fields();
        let mut cfg = ViewConfig::defaults(&fields, 10);
        cfg.reorder_columns(&fields, vec!["c".into(), "a".into()]);
        cfg.toggle_all_columns(&fields, false);
        assert!(cfg.visible_columns().is_empty());
        cfg.toggle_all_columns(&fields, true);
        assert_eq!(cfg.visible_columns(), ["a", "b", "c"]);
    }

    #[test]
    fn invalid_reorder_keeps_previous_order() {
        let fields = fields();
        let mut cfg = ViewConfig::defaults(&fields, 10);
        assert!(cfg.reorder_columns(&fields, vec!["c".into(), "b".into()]));
        assert!(!cfg.reorder_columns(&fields, vec!["a".into(), "a".into()]));
        assert!(!cfg.reorder_columns(&fields, vec!["a".into(), "x".into()]));
        assert_eq!(cfg.visible_columns(), ["c", "b"]);
    }

    #[test]
    fn move_column_swaps_neighbours() {
        let fields = fields();
        let mut cfg = ViewConfig::defaults(&fields, 10);
        assert!(cfg.move_column(&fields, "b", Shift::Left));
        assert_eq!(cfg.visible_columns(), ["b", "a", "c"]);
        assert!(!cfg.move_column(&fields, "b", Shift::Left));
        assert!(cfg.move_column(&fields, "a", Shift::Right));
        assert_eq!(cfg.visible_columns(), ["b", "c", "a"]);
    }

    #[test]
    fn blank_filters_are_inactive() {
        let mut cfg = ViewConfig::defaults(&fields(), 10);
        cfg.set_column_filter("a", "  ");
        cfg.set_column_filter("b", "x");
        assert_eq!(cfg.active_filters().collect::<Vec<_>>(), vec![("b", "x")]);
        assert_eq!(cfg.active_filter_count(), 1);
    }

    #[test]
    fn sort_by_same_field_flips_direction() {
        let mut cfg = ViewConfig::defaults(&fields(), 10);
        cfg.sort_by("a");
        assert_eq!(cfg.sort(), &SortSpec::new("a", SortDirection::Ascending));
        cfg.sort_by("a");
        assert_eq!(cfg.sort().direction(), SortDirection::Descending);
        cfg.sort_by("b");
        assert_eq!(cfg.sort(), &SortSpec::new("b", SortDirection::Ascending));
    }

    #[test]
    fn zero_page_size_is_ignored() {
        let mut cfg = ViewConfig::defaults(&fields(), 25);
        cfg.set_page_size(0);
        assert_eq!(cfg.page_size(), 25);
    }
}
