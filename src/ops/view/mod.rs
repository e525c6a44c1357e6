//! Filter → sort → paginate, applied to the task collection on every render.
//!
//! Everything here is a pure function of its inputs: the same tasks, columns
//! and view state always give the same page, and nothing is mutated.

pub mod filter;
pub mod paginate;
pub mod sort;

pub use filter::{TaskFilter, filter_tasks};
pub use paginate::{Page, Pagination, paginate};
pub use sort::{SortDirection, SortSpec, sort_tasks};

use crate::model::{ColumnDescriptor, Task};

/// Table settings owned by the presentation layer. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub filter: TaskFilter,
    pub sort: Option<SortSpec>,
    pub pagination: Pagination,
}

impl ViewState {
    pub fn with_page_size(page_size: usize) -> Self {
        ViewState {
            pagination: Pagination::new(page_size),
            ..Default::default()
        }
    }

    /// Run the pipeline and return the visible page.
    pub fn apply<'a>(&self, tasks: &'a [Task], columns: &[ColumnDescriptor]) -> Page<&'a Task> {
        let mut rows = filter_tasks(tasks, &self.filter);
        sort_tasks(&mut rows, self.sort.as_ref(), columns);
        paginate(&rows, &self.pagination)
    }

    /// Click-to-sort: the same column flips direction, a new column starts
    /// ascending.
    pub fn toggle_sort(&mut self, field: &str) {
        self.sort = match self.sort.take() {
            Some(current) if current.field == field => Some(SortSpec {
                field: current.field,
                direction: current.direction.toggled(),
            }),
            _ => Some(SortSpec::ascending(field)),
        };
    }
}
