use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// `?page=` query parameter, 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: i64,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1 }
    }
}

fn first_page() -> i64 {
    1
}

/// Window into an ordered listing, resolved against the total row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl PageWindow {
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn pages(&self) -> i64 {
        if self.total <= 0 {
            0
        } else {
            (self.total - 1) / self.per_page + 1
        }
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        let pages = self.pages();
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages,
            has_prev: self.page > 1,
            has_next: self.page < pages,
        }
    }
}

/// Resolve a page request. Page 0, negative pages, and pages past the end
/// (other than an empty first page) are not found.
pub fn paginate(page: i64, per_page: i64, total: i64) -> Result<PageWindow, RecordError> {
    if page < 1 {
        return Err(RecordError::NotFound(format!("page {page}")));
    }
    let window = PageWindow {
        page,
        per_page: per_page.max(1),
        total,
    };
    if page > window.pages().max(1) {
        return Err(RecordError::NotFound(format!("page {page}")));
    }
    Ok(window)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_empty_listing_is_fine() {
        let w = paginate(1, 20, 0).unwrap();
        assert_eq!(w.offset(), 0);
        let page = w.into_page(Vec::<i32>::new());
        assert_eq!(page.pages, 0);
        assert!(!page.has_next && !page.has_prev);
    }

    #[test]
    fn offset_and_flags() {
        let w = paginate(2, 10, 25).unwrap();
        assert_eq!((w.offset(), w.limit()), (10, 10));
        let page = w.into_page(vec![0; 10]);
        assert_eq!(page.pages, 3);
        assert!(page.has_prev);
        assert!(page.has_next);
    }

    #[test]
    fn last_partial_page() {
        let page = paginate(3, 10, 25).unwrap().into_page(vec![0; 5]);
        assert!(!page.has_next);
    }

    #[test]
    fn out_of_range_pages_are_not_found() {
        assert!(matches!(paginate(0, 10, 5), Err(RecordError::NotFound(_))));
        assert!(matches!(paginate(2, 10, 10), Err(RecordError::NotFound(_))));
        assert!(matches!(paginate(2, 10, 0), Err(RecordError::NotFound(_))));
    }

    #[test]
    fn huge_page_numbers_are_not_found() {
        assert!(matches!(
            paginate(i64::MAX, 20, 5),
            Err(RecordError::NotFound(_))
        ));
        assert!(matches!(
            paginate(i64::MAX, i64::MAX, 5),
            Err(RecordError::NotFound(_))
        ));
    }
}
