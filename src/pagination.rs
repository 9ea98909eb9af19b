//! Page metadata returned by listing endpoints, and the compact page-number
//! window shown in page selectors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Beyond this many pages the window elides ranges with an ellipsis
const MAX_VISIBLE_PAGES: u32 = 6;

/// Pagination metadata attached to listing responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// True when `page` lies past the last page (an empty result)
    pub fn is_beyond_last_page(&self, page: u32) -> bool {
        page > self.total_pages
    }

    /// Markers for this response's current page
    pub fn window(&self) -> Vec<PageMarker> {
        page_window(self.current_page, self.total_pages)
    }
}

/// One entry of a page selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(u32),
    /// A non-interactive gap standing for the elided pages
    Ellipsis,
}

impl PageMarker {
    pub fn page(self) -> Option<u32> {
        match self {
            PageMarker::Page(n) => Some(n),
            PageMarker::Ellipsis => None,
        }
    }
}

impl fmt::Display for PageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageMarker::Page(n) => write!(f, "{n}"),
            PageMarker::Ellipsis => f.write_str("..."),
        }
    }
}

/// Build the page markers for `current_page` out of `total_pages`.
///
/// Up to six pages are listed in full. Past that the first and last pages
/// are always shown, with the current page's neighbourhood in between and
/// ellipses standing for the gaps.
pub fn page_window(current_page: u32, total_pages: u32) -> Vec<PageMarker> {
    use PageMarker::{Ellipsis, Page};

    if total_pages <= MAX_VISIBLE_PAGES {
        return (1..=total_pages).map(Page).collect();
    }

    if current_page <= 3 {
        vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(total_pages)]
    } else if current_page >= total_pages - 2 {
        let mut pages = vec![Page(1), Ellipsis];
        pages.extend((total_pages - 3..=total_pages).map(Page));
        pages
    } else {
        vec![
            Page(1),
            Ellipsis,
            Page(current_page - 1),
            Page(current_page),
            Page(current_page + 1),
            Ellipsis,
            Page(total_pages),
        ]
    }
}
