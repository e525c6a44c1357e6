use crate::model::{ColumnDescriptor, Task};

const DEFAULT_TASKS: &str = include_str!("../templates/tasks.json");
const DEFAULT_COLUMNS: &str = include_str!("../templates/tableColumns.json");

/// The task list a fresh install starts with
pub fn default_tasks() -> Result<Vec<Task>, serde_json::Error> {
    serde_json::from_str(DEFAULT_TASKS)
}

/// The column list a fresh install starts with
pub fn default_columns() -> Result<Vec<ColumnDescriptor>, serde_json::Error> {
    serde_json::from_str(DEFAULT_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builtin_columns;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn bundled_columns_are_the_builtins() {
        assert_eq!(default_columns().unwrap(), builtin_columns());
    }

    #[test]
    fn bundled_tasks_are_valid() {
        let tasks = default_tasks().unwrap();
        assert!(!tasks.is_empty());
        let ids: HashSet<_> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), tasks.len());
        for task in &tasks {
            assert!(!task.title.trim().is_empty());
            assert!(task.status.is_recognized());
            assert!(task.priority.is_recognized());
            assert!(task.fields.is_empty());
        }
    }
}
