use serde::{Deserialize, Serialize};

const MAX_LIMIT: i64 = 100;
// keeps `page * limit` inside i64 for every allowed limit
const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// `?page=&limit=` query parameters. `limit` falls back to the configured page size.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn resolve(self, default_limit: i64) -> PageWindow {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, MAX_LIMIT);
        PageWindow { page, limit }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(window: PageWindow, count: i64, results: Vec<T>) -> Self {
        let next = (window.page.saturating_mul(window.limit) < count)
            .then_some(window.page.saturating_add(1));
        let previous = (window.page > 1).then_some(window.page - 1);
        Self {
            count,
            next,
            previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let w = PageParams::default().resolve(6);
        assert_eq!(w, PageWindow { page: 1, limit: 6 });
        assert_eq!(w.offset(), 0);

        let w = PageParams { page: Some(0), limit: Some(1000) }.resolve(6);
        assert_eq!(w, PageWindow { page: 1, limit: MAX_LIMIT });

        let w = PageParams { page: Some(3), limit: Some(10) }.resolve(6);
        assert_eq!(w.offset(), 20);
    }

    #[test]
    fn huge_page_numbers_stay_in_range() {
        let w = PageParams { page: Some(i64::MAX), limit: Some(6) }.resolve(6);
        assert_eq!(w.page, MAX_PAGE);
        assert!(w.offset() > 0);

        let page = Page::<i32>::new(w, 0, vec![]);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(MAX_PAGE - 1));

        let w = PageParams { page: Some(i64::MAX), limit: Some(MAX_LIMIT) }.resolve(6);
        assert_eq!(w.offset(), (MAX_PAGE - 1) * MAX_LIMIT);
    }

    #[test]
    fn next_and_previous_links() {
        let w = PageWindow { page: 2, limit: 6 };
        let page = Page::new(w, 13, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::new(PageWindow { page: 3, limit: 6 }, 13, vec![7]);
        assert_eq!(last.next, None);

        let only = Page::<i32>::new(PageWindow { page: 1, limit: 6 }, 0, vec![]);
        assert_eq!(only.next, None);
        assert_eq!(only.previous, None);
    }
}
