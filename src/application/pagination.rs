//! Page-number pagination over cached post lists.

use std::num::NonZeroUsize;

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page numbers start at 1")]
    ZeroPage,
    #[error("page {page} is past the last page ({last})")]
    OutOfRange { page: usize, last: usize },
}

/// One page of a list. Page numbers are 1-based; an empty list still has a
/// first page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

pub fn paginate<T: Clone>(
    items: &[T],
    number: usize,
    size: NonZeroUsize,
) -> Result<Page<T>, PaginationError> {
    if number == 0 {
        return Err(PaginationError::ZeroPage);
    }

    let total = items.len();
    let num_pages = total.div_ceil(size.get()).max(1);
    if number > num_pages {
        return Err(PaginationError::OutOfRange {
            page: number,
            last: num_pages,
        });
    }

    let start = (number - 1) * size.get();
    let end = (start + size.get()).min(total);

    Ok(Page {
        items: items[start..end].to_vec(),
        number,
        num_pages,
        total,
    })
}
