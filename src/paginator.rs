//! Page slicing and the page-number strip shown under the table.

/// Page strips up to this many pages list every page.
const MAX_LISTED_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
    pub rows: &'a [usize],
    pub start: usize, // 0-based, inclusive
    pub end: usize,   // 0-based, exclusive
    pub total_pages: usize,
}

pub fn total_pages(nrows: usize, page_size: usize) -> usize {
    nrows.div_ceil(page_size.max(1)).max(1)
}

pub fn paginate(rows: &[usize], page_size: usize, current_page: usize) -> Page<'_> {
    let page_size = page_size.max(1);
    let start = current_page
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(rows.len());
    let end = start.saturating_add(page_size).min(rows.len());
    Page {
        rows: &rows[start..end],
        start,
        end,
        total_pages: total_pages(rows.len(), page_size),
    }
}

/// Pages to offer for navigation. Long strips keep the first and last page
/// and a window of one page around the current one, with an ellipsis for
/// each skipped range.
pub fn page_numbers(total_pages: usize, current_page: usize) -> Vec<PageItem> {
    let total_pages = total_pages.max(1);
    if total_pages <= MAX_LISTED_PAGES {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let current = current_page.clamp(1, total_pages);
    let left = current.saturating_sub(1).max(2);
    let right = (current + 1).min(total_pages - 1);

    let mut items = vec![PageItem::Page(1)];
    if left > 2 {
        items.push(PageItem::Ellipsis);
    }
    items.extend((left..=right).map(PageItem::Page));
    if right < total_pages - 1 {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total_pages));
    items
}

#[cfg(test)]
mod tests {
    use super::PageItem::{Ellipsis, Page as P};
    use super::*;

    #[test]
    fn total_pages_is_at_least_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn paginate_slices_the_current_page() {
        let rows: Vec<usize> = (0..23).collect();
        let page = paginate(&rows, 10, 3);
        assert_eq!(page.rows, &[20, 21, 22]);
        assert_eq!((page.start, page.end, page.total_pages), (20, 23, 3));
    }

    #[test]
    fn paginate_clamps_start_past_the_end() {
        let rows: Vec<usize> = (0..5).collect();
        let page = paginate(&rows, 10, 4);
        assert!(page.rows.is_empty());
        assert_eq!((page.start, page.end), (5, 5));
    }

    #[test]
    fn short_strips_list_every_page() {
        assert_eq!(page_numbers(1, 1), vec![P(1)]);
        assert_eq!(page_numbers(5, 3), vec![P(1), P(2), P(3), P(4), P(5)]);
    }

    #[test]
    fn long_strip_around_middle_page() {
        assert_eq!(
            page_numbers(12, 7),
            vec![P(1), Ellipsis, P(6), P(7), P(8), Ellipsis, P(12)]
        );
    }

    #[test]
    fn long_strip_at_the_edges() {
        assert_eq!(page_numbers(12, 1), vec![P(1), P(2), Ellipsis, P(12)]);
        assert_eq!(page_numbers(12, 2), vec![P(1), P(2), P(3), Ellipsis, P(12)]);
        assert_eq!(page_numbers(12, 12), vec![P(1), Ellipsis, P(11), P(12)]);
        assert_eq!(page_numbers(6, 3), vec![P(1), P(2), P(3), P(4), Ellipsis, P(6)]);
    }

    #[test]
    fn strip_has_no_duplicate_pages() {
        for total in 1..30 {
            for current in 1..=total {
                let pages: Vec<usize> = page_numbers(total, current)
                    .into_iter()
                    .filter_map(|item| match item {
                        P(n) => Some(n),
                        Ellipsis => None,
                    })
                    .collect();
                let mut dedup = pages.clone();
                dedup.dedup();
                assert_eq!(pages, dedup, "total {total}, current {current}");
                assert!(pages.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
