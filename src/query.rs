//! Derivation of the displayed row sequence.
//!
//! `derive` runs search, column filters and sorting in this fixed order and
//! returns indices into `Dataset::rows`. It never fails: unknown fields and
//! missing cells compare as empty strings.

use std::cmp::Ordering;

use tracing::trace;

use crate::dataset::Dataset;
use crate::view::{SortSpec, ViewConfig};

pub fn derive(dataset: &Dataset, config: &ViewConfig) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..dataset.len()).collect();

    let term = config.search_term().trim();
    if !term.is_empty() {
        rows = search(dataset, &rows, term);
    }

    for (field, value) in config.active_filters() {
        rows = filter_column(dataset, &rows, field, value);
    }

    if config.sort().field().is_some() {
        sort(dataset, &mut rows, config.sort());
    }

    trace!(
        "Derived {} of {} rows (search {:?}, {} filters, sort {:?})",
        rows.len(),
        dataset.len(),
        term,
        config.active_filter_count(),
        config.sort()
    );
    rows
}

// Keep rows where any cell contains the term, ignoring case.
fn search(dataset: &Dataset, rows: &[usize], term: &str) -> Vec<usize> {
    let term = term.to_lowercase();
    rows.iter()
        .copied()
        .filter(|&ridx| {
            dataset.rows()[ridx]
                .cells()
                .iter()
                .any(|cell| cell.to_lowercase().contains(&term))
        })
        .collect()
}

fn filter_column(dataset: &Dataset, rows: &[usize], field: &str, value: &str) -> Vec<usize> {
    let value = value.to_lowercase();
    rows.iter()
        .copied()
        .filter(|&ridx| dataset.value(ridx, field).to_lowercase().contains(&value))
        .collect()
}

/// Stable sort of `rows` by the sort field. The column sorts numerically when
/// every compared value is a number, otherwise by lower-cased text.
fn sort(dataset: &Dataset, rows: &mut Vec<usize>, spec: &SortSpec) {
    let Some(field) = spec.field() else {
        return;
    };
    let direction = spec.direction();
    let values: Vec<&str> = rows.iter().map(|&r| dataset.value(r, field)).collect();
    let mut order: Vec<usize> = (0..rows.len()).collect();

    let numbers: Option<Vec<f64>> = values.iter().map(|v| parse_number(v)).collect();
    match numbers {
        Some(numbers) => {
            // NaN never gets here, -0 and 0 compare equal
            order.sort_by(|&a, &b| {
                let ord = numbers[a].partial_cmp(&numbers[b]).unwrap_or(Ordering::Equal);
                direction.apply(ord)
            });
        }
        None => {
            let keys: Vec<String> = values.iter().map(|v| v.to_lowercase()).collect();
            order.sort_by(|&a, &b| direction.apply(keys[a].cmp(&keys[b])));
        }
    }

    let sorted: Vec<usize> = order.into_iter().map(|i| rows[i]).collect();
    *rows = sorted;
}

/// A cell counts as a number when, without surrounding whitespace, it is
/// non-empty and parses completely as a float. NaN does not count.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| !n.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;
    use crate::view::SortDirection;

    fn dataset(fields: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            "test.csv",
            fields.iter().map(|f| f.to_string()).collect(),
            rows.iter()
                .map(|r| Row::new(r.iter().map(|c| c.to_string()).collect()))
                .collect(),
        )
    }

    fn people() -> Dataset {
        dataset(
            &["name", "age"],
            &[&["Bob", "30"], &["Amy", "9"], &["Cid", "21"]],
        )
    }

    fn config(ds: &Dataset) -> ViewConfig {
        ViewConfig::defaults(ds.fields(), 10)
    }

    fn column<'a>(ds: &'a Dataset, rows: &[usize], field: &str) -> Vec<&'a str> {
        rows.iter().map(|&r| ds.value(r, field)).collect()
    }

    #[test]
    fn numeric_sort_by_age() {
        let ds = people();
        let mut cfg = config(&ds);
        cfg.set_sort(SortSpec::new("age", SortDirection::Ascending));
        let rows = derive(&ds, &cfg);
        assert_eq!(column(&ds, &rows, "name"), vec!["Amy", "Cid", "Bob"]);

        cfg.set_sort(SortSpec::new("age", SortDirection::Descending));
        let rows = derive(&ds, &cfg);
        assert_eq!(column(&ds, &rows, "name"), vec!["Bob", "Cid", "Amy"]);
    }

    #[test]
    fn all_numeric_column_sorts_numerically() {
        let ds = dataset(&["v"], &[&["10"], &["9"], &["2"]]);
        let mut cfg = config(&ds);
        cfg.sort_by("v");
        assert_eq!(column(&ds, &derive(&ds, &cfg), "v"), vec!["2", "9", "10"]);
    }

    #[test]
    fn mixed_column_sorts_lexicographically() {
        let ds = dataset(&["v"], &[&["alpha"], &["9"], &["10"]]);
        let mut cfg = config(&ds);
        cfg.sort_by("v");
        assert_eq!(
            column(&ds, &derive(&ds, &cfg), "v"),
            vec!["10", "9", "alpha"]
        );
    }

    #[test]
    fn blank_values_are_not_numeric() {
        let ds = dataset(&["v"], &[&["10"], &[" "], &["9"]]);
        let mut cfg = config(&ds);
        cfg.sort_by("v");
        assert_eq!(column(&ds, &derive(&ds, &cfg), "v"), vec![" ", "10", "9"]);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(" 4.5 "), Some(4.5));
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let ds = dataset(
            &["id", "group"],
            &[&["1", "b"], &["2", "A"], &["3", "a"], &["4", "B"], &["5", "a"]],
        );
        let mut cfg = config(&ds);
        cfg.set_sort(SortSpec::new("group", SortDirection::Ascending));
        assert_eq!(
            column(&ds, &derive(&ds, &cfg), "id"),
            vec!["2", "3", "5", "1", "4"]
        );
        cfg.set_sort(SortSpec::new("group", SortDirection::Descending));
        assert_eq!(
            column(&ds, &derive(&ds, &cfg), "id"),
            vec!["1", "4", "2", "3", "5"]
        );
    }

    #[test]
    fn signed_zeros_are_equal_keys() {
        let ds = dataset(&["id", "v"], &[&["a", "0"], &["b", "-0"], &["c", "-1"]]);
        let mut cfg = config(&ds);
        cfg.set_sort(SortSpec::new("v", SortDirection::Ascending));
        assert_eq!(column(&ds, &derive(&ds, &cfg), "id"), vec!["c", "a", "b"]);
        cfg.set_sort(SortSpec::new("v", SortDirection::Descending));
        assert_eq!(column(&ds, &derive(&ds, &cfg), "id"), vec!["a", "b", "c"]);
    }

    #[test]
    fn search_matches_any_field_ignoring_case() {
        let ds = people();
        let mut cfg = config(&ds);
        cfg.set_search_term("  aM ");
        assert_eq!(column(&ds, &derive(&ds, &cfg), "name"), vec!["Amy"]);
        cfg.set_search_term("2");
        assert_eq!(column(&ds, &derive(&ds, &cfg), "name"), vec!["Cid"]);
        cfg.set_search_term("   ");
        assert_eq!(derive(&ds, &cfg).len(), 3);
    }

    #[test]
    fn filters_compose_with_and() {
        let ds = dataset(
            &["a", "b"],
            &[&["x1", "y1"], &["x2", "z"], &["q", "y2"], &["X3", "Y3"]],
        );
        let mut cfg = config(&ds);
        cfg.set_column_filter("a", "x");
        cfg.set_column_filter("b", "y");
        let both = derive(&ds, &cfg);
        assert_eq!(column(&ds, &both, "a"), vec!["x1", "X3"]);

        cfg.remove_filter("b");
        let widened = derive(&ds, &cfg);
        assert!(both.iter().all(|r| widened.contains(r)));
        assert_eq!(column(&ds, &widened, "a"), vec!["x1", "x2", "X3"]);
    }

    #[test]
    fn unknown_filter_field_matches_nothing_but_blank_filter_matches_all() {
        let ds = people();
        let mut cfg = config(&ds);
        cfg.set_column_filter("nope", "   ");
        assert_eq!(derive(&ds, &cfg).len(), 3);
        cfg.set_column_filter("nope", "a");
        assert!(derive(&ds, &cfg).is_empty());
    }

    #[test]
    fn derive_is_deterministic() {
        let ds = people();
        let mut cfg = config(&ds);
        cfg.set_search_term("i");
        cfg.sort_by("name");
        assert_eq!(derive(&ds, &cfg), derive(&ds, &cfg));
    }
}
