//! Page clamping and the page-number window under a list

use keywatch_types::total_pages;
use serde::Serialize;

/// One element of the pagination bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageLink {
    Previous { target: u32, enabled: bool },
    Page { number: u32, current: bool },
    Ellipsis,
    Next { target: u32, enabled: bool },
}

/// Clamp a requested page into `[1, total_pages]`.
///
/// Zero total pages is treated as page 1 with an empty result.
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.clamp(1, total_pages.max(1))
}

/// Build the pagination bar for `current` out of `total` items.
///
/// At most `width` page numbers are shown around the current page. The first
/// and last pages are always reachable and an ellipsis marks a gap between
/// them and the window. Nothing is rendered for a single page.
pub fn page_window(current: u32, total: u64, page_size: u32, width: u32) -> Vec<PageLink> {
    let pages = total_pages(total, page_size);
    if pages <= 1 {
        return Vec::new();
    }

    let current = clamp_page(current, pages);
    let width = width.max(1);
    let before = (width - 1) / 2;
    let after = width - 1 - before;
    let start = current.saturating_sub(before).max(1);
    let end = current.saturating_add(after).min(pages);

    let mut links = Vec::with_capacity(width as usize + 6);
    links.push(PageLink::Previous {
        target: current.saturating_sub(1).max(1),
        enabled: current > 1,
    });

    if start > 1 {
        links.push(PageLink::Page {
            number: 1,
            current: false,
        });
        if start > 2 {
            links.push(PageLink::Ellipsis);
        }
    }

    for number in start..=end {
        links.push(PageLink::Page {
            number,
            current: number == current,
        });
    }

    if end < pages {
        if end < pages - 1 {
            links.push(PageLink::Ellipsis);
        }
        links.push(PageLink::Page {
            number: pages,
            current: false,
        });
    }

    links.push(PageLink::Next {
        target: (current + 1).min(pages),
        enabled: current < pages,
    });
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(links: &[PageLink]) -> Vec<String> {
        links
            .iter()
            .filter_map(|link| match link {
                PageLink::Page { number, current } => Some(if *current {
                    format!("[{number}]")
                } else {
                    number.to_string()
                }),
                PageLink::Ellipsis => Some("...".to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(5, 3), 3);
        assert_eq!(clamp_page(0, 3), 1);
        assert_eq!(clamp_page(2, 0), 1);
        assert_eq!(clamp_page(2, 3), 2);
    }

    #[test]
    fn test_single_page_renders_nothing() {
        assert!(page_window(1, 20, 20, 5).is_empty());
        assert!(page_window(1, 0, 20, 5).is_empty());
    }

    #[test]
    fn test_window_in_the_middle() {
        let links = page_window(10, 400, 20, 5);
        assert_eq!(
            numbers(&links),
            vec!["1", "...", "8", "9", "[10]", "11", "12", "...", "20"]
        );
    }

    #[test]
    fn test_window_touching_the_start() {
        let links = page_window(2, 400, 20, 5);
        assert_eq!(numbers(&links), vec!["1", "[2]", "3", "4", "...", "20"]);
        assert_eq!(
            links.first(),
            Some(&PageLink::Previous {
                target: 1,
                enabled: true
            })
        );
    }

    #[test]
    fn test_no_ellipsis_for_adjacent_edge() {
        let links = page_window(4, 120, 20, 5);
        assert_eq!(numbers(&links), vec!["1", "2", "3", "[4]", "5", "6"]);
    }

    #[test]
    fn test_last_page_disables_next() {
        let links = page_window(3, 47, 20, 5);
        assert_eq!(numbers(&links), vec!["1", "2", "[3]"]);
        assert_eq!(
            links.last(),
            Some(&PageLink::Next {
                target: 3,
                enabled: false
            })
        );
    }

    #[test]
    fn test_window_never_exceeds_width() {
        for current in 1..=30 {
            let links = page_window(current, 600, 20, 5);
            let window = links
                .iter()
                .filter(|l| matches!(l, PageLink::Page { .. }))
                .count();
            // window plus the two pinned edges
            assert!(window <= 7, "page {current} rendered {window} numbers");
        }
    }
}
