/// 1-indexed page position and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(10)
    }
}

impl Pagination {
    /// A page size of 0 is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Pagination {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the page size always returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    /// Out-of-range pages are clamped when the window is computed.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page;
    }

    pub fn next(&mut self) {
        self.current_page = self.current_page.saturating_add(1);
    }

    pub fn previous(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    /// At least one page, even when there is nothing to show
    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Clamp the requested page into `1..=total_pages`
    pub fn clamped_page(&self, total: usize) -> usize {
        self.current_page.clamp(1, self.total_pages(total))
    }

    /// Index range of the visible window into a list of `total` items
    pub fn window(&self, total: usize) -> std::ops::Range<usize> {
        let page = self.clamped_page(total);
        let start = ((page - 1) * self.page_size).min(total);
        let end = (page * self.page_size).min(total);
        start..end
    }
}

/// One rendered page of the table
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page actually shown, after clamping
    pub current_page: usize,
    pub total_pages: usize,
    /// Rows after filtering, across all pages
    pub total: usize,
}

/// Cut the visible window out of an already filtered and sorted list.
pub fn paginate<T: Clone>(items: &[T], pagination: &Pagination) -> Page<T> {
    let total = items.len();
    Page {
        items: items[pagination.window(total)].to_vec(),
        current_page: pagination.clamped_page(total),
        total_pages: pagination.total_pages(total),
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn windows_are_half_open() {
        let items: Vec<u32> = (1..=25).collect();
        let mut pagination = Pagination::new(10);
        let page = paginate(&items, &pagination);
        assert_eq!(page.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);

        pagination.set_page(3);
        let page = paginate(&items, &pagination);
        assert_eq!(page.items, (21..=25).collect::<Vec<_>>());
        assert_eq!(page.current_page, 3);
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let items: Vec<u32> = Vec::new();
        let mut pagination = Pagination::new(10);
        pagination.set_page(7);
        let page = paginate(&items, &pagination);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total, 0);
    }

    #[test]
    fn out_of_range_pages_clamp() {
        let items: Vec<u32> = (1..=5).collect();
        let mut pagination = Pagination::new(2);
        pagination.set_page(0);
        assert_eq!(paginate(&items, &pagination).items, vec![1, 2]);
        pagination.set_page(99);
        let page = paginate(&items, &pagination);
        assert_eq!(page.items, vec![5]);
        assert_eq!(page.current_page, 3);
    }

    #[test]
    fn changing_page_size_resets_to_first_page() {
        let mut pagination = Pagination::new(5);
        pagination.set_page(4);
        pagination.set_page_size(20);
        assert_eq!(pagination.current_page(), 1);
        assert_eq!(pagination.page_size(), 20);
    }

    #[test]
    fn zero_page_size_is_one() {
        let pagination = Pagination::new(0);
        assert_eq!(pagination.page_size(), 1);
        assert_eq!(pagination.total_pages(3), 3);
    }

    #[test]
    fn previous_stops_at_first_page() {
        let mut pagination = Pagination::new(5);
        pagination.previous();
        assert_eq!(pagination.current_page(), 1);
        pagination.next();
        assert_eq!(pagination.current_page(), 2);
    }
}
