//! Page arithmetic for the results table.

use std::ops::Range;

/// Rows shown per results page.
pub const PAGE_SIZE: usize = 10;

/// Zero-based page cursor over a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of pages for `total` rows. An empty set still has one page.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Row indices on the current page, clamped to `total`.
    pub fn range(&self, total: usize) -> Range<usize> {
        let start = (self.page * self.page_size).min(total);
        let end = (start + self.page_size).min(total);
        start..end
    }

    pub fn first(&mut self) {
        self.page = 0;
    }

    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1);
    }

    pub fn next(&mut self, total: usize) {
        if self.page + 1 < self.page_count(total) {
            self.page += 1;
        }
    }

    pub fn last(&mut self, total: usize) {
        self.page = self.page_count(total) - 1;
    }

    /// "Page 2 of 5 (41 rows)" style label.
    pub fn label(&self, total: usize) -> String {
        format!(
            "Page {} of {} ({} row{})",
            self.page + 1,
            self.page_count(total),
            total,
            if total == 1 { "" } else { "s" }
        )
    }
}
