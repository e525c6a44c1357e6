//! Schema registry rules: which fields a task may carry, and keeping every
//! task in step with the column list.

use indexmap::IndexMap;

use crate::model::{
    ColumnDescriptor, FieldType, FieldValue, NewTask, Task, TaskId, TaskPatch, is_builtin_field,
};

/// A record or schema change rejected before anything was touched
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("title is required")]
    EmptyTitle,
    #[error("field name is required")]
    EmptyFieldName,
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {field} expects a {expected} value, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: FieldType,
    },
    #[error("field {0} needs a finite number")]
    NonFiniteNumber(String),
    #[error("missing value for field: {0}")]
    MissingField(String),
    #[error("task id {0} is already in use")]
    DuplicateId(TaskId),
    #[error("invalid status: {0}")]
    UnrecognizedStatus(String),
    #[error("invalid priority: {0}")]
    UnrecognizedPriority(String),
    #[error("{0} is a built-in column")]
    BuiltinColumn(String),
    #[error("no task ids left after {0}")]
    IdsExhausted(TaskId),
}

/// Exact lookup by field name
pub fn find_column<'a>(columns: &'a [ColumnDescriptor], field: &str) -> Option<&'a ColumnDescriptor> {
    columns.iter().find(|c| c.field == field)
}

/// Case-insensitive collision check used when adding a column
pub fn field_exists(columns: &[ColumnDescriptor], name: &str) -> bool {
    columns.iter().any(|c| c.matches_name(name)) || is_builtin_field(name)
}

pub fn custom_columns(columns: &[ColumnDescriptor]) -> impl Iterator<Item = &ColumnDescriptor> {
    columns.iter().filter(|c| c.custom)
}

pub fn check_type(field: &str, expected: FieldType, value: &FieldValue) -> Result<(), ValidationError> {
    let found = value.field_type();
    if let FieldValue::Number(n) = value
        && !n.is_finite()
    {
        return Err(ValidationError::NonFiniteNumber(field.to_string()));
    }
    if found == expected {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            field: field.to_string(),
            expected,
            found,
        })
    }
}

fn check_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        Err(ValidationError::EmptyTitle)
    } else {
        Ok(())
    }
}

fn check_custom_values(
    fields: &IndexMap<String, FieldValue>,
    columns: &[ColumnDescriptor],
) -> Result<(), ValidationError> {
    for (name, value) in fields {
        let column = find_column(columns, name)
            .ok_or_else(|| ValidationError::UnknownField(name.clone()))?;
        if !column.custom {
            return Err(ValidationError::BuiltinColumn(name.clone()));
        }
        check_type(name, column.field_type, value)?;
    }
    Ok(())
}

/// Validate a record for `add_task`.
pub fn validate_new_task(
    record: &NewTask,
    columns: &[ColumnDescriptor],
    tasks: &[Task],
) -> Result<(), ValidationError> {
    check_title(&record.title)?;
    if !record.status.is_recognized() {
        return Err(ValidationError::UnrecognizedStatus(record.status.to_string()));
    }
    if !record.priority.is_recognized() {
        return Err(ValidationError::UnrecognizedPriority(record.priority.to_string()));
    }
    if let Some(id) = record.id
        && tasks.iter().any(|t| t.id == id)
    {
        return Err(ValidationError::DuplicateId(id));
    }
    check_custom_values(&record.fields, columns)?;
    for column in custom_columns(columns) {
        if !record.fields.contains_key(&column.field) {
            return Err(ValidationError::MissingField(column.field.clone()));
        }
    }
    Ok(())
}

/// Validate a partial record for `update_task` / `bulk_edit`.
pub fn validate_patch(patch: &TaskPatch, columns: &[ColumnDescriptor]) -> Result<(), ValidationError> {
    if let Some(title) = &patch.title {
        check_title(title)?;
    }
    if let Some(status) = &patch.status
        && !status.is_recognized()
    {
        return Err(ValidationError::UnrecognizedStatus(status.to_string()));
    }
    if let Some(priority) = &patch.priority
        && !priority.is_recognized()
    {
        return Err(ValidationError::UnrecognizedPriority(priority.to_string()));
    }
    check_custom_values(&patch.fields, columns)
}

/// Next free id: one past the largest in use
pub fn next_task_id(tasks: &[Task]) -> Result<TaskId, ValidationError> {
    match tasks.iter().map(|t| t.id).max() {
        None => Ok(TaskId(1)),
        Some(max) => max
            .0
            .checked_add(1)
            .map(TaskId)
            .ok_or(ValidationError::IdsExhausted(max)),
    }
}

/// Extend `columns` with a custom column for every task key it does not
/// know, typed by the first value seen. Used when tasks were stored without
/// a schema, so their values survive `reconcile`.
pub fn infer_columns(mut columns: Vec<ColumnDescriptor>, tasks: &[Task]) -> Vec<ColumnDescriptor> {
    for task in tasks {
        for (name, value) in &task.fields {
            if is_builtin_field(name) || find_column(&columns, name).is_some() {
                continue;
            }
            let field_type = value.field_type();
            columns.push(ColumnDescriptor::custom(name, field_type, field_type.empty_value()));
        }
    }
    columns
}

/// Bring loaded tasks in line with the schema: fill missing custom fields
/// with the column default, drop keys with no column, and reorder the rest
/// to schema order. Returns how many tasks changed.
pub fn reconcile(tasks: &mut [Task], columns: &[ColumnDescriptor]) -> usize {
    let mut changed = 0;
    for task in tasks.iter_mut() {
        let mut fields = IndexMap::new();
        for column in custom_columns(columns) {
            let value = task
                .fields
                .get(&column.field)
                .cloned()
                .unwrap_or_else(|| column_default(column));
            fields.insert(column.field.clone(), value);
        }
        if fields != task.fields {
            task.fields = fields;
            changed += 1;
        }
    }
    changed
}

pub fn column_default(column: &ColumnDescriptor) -> FieldValue {
    column
        .default_value
        .clone()
        .unwrap_or_else(|| column.field_type.empty_value())
}
