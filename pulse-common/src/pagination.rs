use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::RangeInclusive};

pub const ADMIN_PAGE_SIZE: u32 = 15;

/// A 1-based page over `total` items, `page_size` items per page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
pub struct Pagination {
    page: u32,
    page_size: u32,
    total: u32,
}

impl Pagination {
    /// Page numbers past the end are clamped to the last page.
    #[must_use]
    pub fn new(page: u32, page_size: u32, total: u32) -> Self {
        let page_size = page_size.max(1);
        let last = total.div_ceil(page_size).max(1);
        Self {
            page: page.clamp(1, last),
            page_size,
            total,
        }
    }

    #[must_use]
    pub fn admin(page: u32, total: u32) -> Self {
        Self::new(page, ADMIN_PAGE_SIZE, total)
    }

    #[must_use]
    pub fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn total(self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn limit(self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn offset(self) -> u32 {
        (self.page - 1) * self.page_size
    }

    /// Number of page buttons to render.
    #[must_use]
    pub fn page_count(self) -> u32 {
        self.total.div_ceil(self.page_size)
    }

    #[must_use]
    pub fn page_numbers(self) -> RangeInclusive<u32> {
        1..=self.page_count()
    }

    #[must_use]
    pub fn has_previous(self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(self) -> bool {
        self.page < self.page_count()
    }

    /// 1-based first and last item shown on this page; `(0, 0)` when empty.
    #[must_use]
    pub fn range(self) -> (u32, u32) {
        if self.total == 0 {
            return (0, 0);
        }
        let first = self.offset() + 1;
        let last = (self.page * self.page_size).min(self.total);
        (first, last)
    }

    #[must_use]
    pub fn label(self) -> PageLabel {
        PageLabel(self)
    }
}

/// Renders as `Showing X–Y of T`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageLabel(Pagination);

impl Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (first, last) = self.0.range();
        write!(f, "Showing {first}–{last} of {}", self.0.total)
    }
}

/// One page of a listing plus the total the server reports.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
}
