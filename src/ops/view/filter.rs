use indexmap::IndexMap;

use crate::model::{FieldValue, Priority, Task, TaskStatus};

/// Filter settings from the table toolbar.
///
/// All active predicates must hold. Within the priority and status sets any
/// member may match. Empty text and empty sets are inactive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub title: String,
    pub priorities: Vec<Priority>,
    pub statuses: Vec<TaskStatus>,
    /// Per custom field: substring for text, equality for number and boolean
    pub fields: IndexMap<String, FieldValue>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.priorities.is_empty()
            && self.statuses.is_empty()
            && self.fields.values().all(|v| !is_active(v))
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.matches_title(task)
            && self.matches_priority(task)
            && self.matches_status(task)
            && self
                .fields
                .iter()
                .filter(|(_, wanted)| is_active(wanted))
                .all(|(field, wanted)| value_matches(task.get(field).as_ref(), wanted))
    }

    fn matches_title(&self, task: &Task) -> bool {
        self.title.is_empty() || contains_ignore_case(&task.title, &self.title)
    }

    fn matches_priority(&self, task: &Task) -> bool {
        self.priorities.is_empty()
            || self
                .priorities
                .iter()
                .any(|p| p.as_str().eq_ignore_ascii_case(task.priority.as_str()))
    }

    fn matches_status(&self, task: &Task) -> bool {
        self.statuses.is_empty()
            || self
                .statuses
                .iter()
                .any(|s| s.as_str().eq_ignore_ascii_case(task.status.as_str()))
    }
}

/// Keep the tasks that pass `filter`, in their original order.
pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filter.matches(t)).collect()
}

fn is_active(wanted: &FieldValue) -> bool {
    !matches!(wanted, FieldValue::Text(s) if s.is_empty())
}

fn value_matches(actual: Option<&FieldValue>, wanted: &FieldValue) -> bool {
    match (actual, wanted) {
        (Some(FieldValue::Text(have)), FieldValue::Text(want)) => contains_ignore_case(have, want),
        (Some(FieldValue::Number(have)), FieldValue::Number(want)) => have == want,
        (Some(FieldValue::Boolean(have)), FieldValue::Boolean(want)) => have == want,
        _ => false,
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
