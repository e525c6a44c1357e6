use std::collections::HashSet;
use std::sync::mpsc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::io::seed;
use crate::io::storage::{Storage, StorageError};
use crate::model::{
    ColumnDescriptor, FieldType, FieldValue, InsertPosition, NewTask, Task, TaskId, TaskPatch,
};
use crate::ops::schema::{self, ValidationError};
use crate::ops::undo::{BulkKind, UndoBuffer, UndoSnapshot};

pub const TASKS_KEY: &str = "tasks";
pub const COLUMNS_KEY: &str = "tableColumns";
pub const UNDO_KEY: &str = "undoState";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no tasks selected")]
    NoSelection,
    #[error("field already exists: {0}")]
    FieldExists(String),
    #[error("could not save: {0}")]
    Storage(#[from] StorageError),
    #[error("stored {key} is not valid JSON for this version: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("store used before initialize()")]
    NotInitialized,
}

/// Change notifications sent to subscribers after a successful operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded,
    TasksChanged,
    ColumnsChanged,
    UndoChanged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreOptions {
    pub insert: InsertPosition,
    /// Also keep the undo buffer in storage, so it survives a restart
    pub persist_undo: bool,
}

/// Next state for one mutation. Only the parts that are `Some` change.
#[derive(Default)]
struct Commit {
    tasks: Option<Vec<Task>>,
    columns: Option<Vec<ColumnDescriptor>>,
    undo: Option<UndoBuffer>,
}

/// Single source of truth for tasks and the column schema.
///
/// Every mutation is validated up front, written to storage, and only then
/// applied in memory, so what is shown is always what a reload would show.
/// A failed write leaves both memory and storage as they were.
pub struct TaskStore<S: Storage> {
    storage: S,
    options: StoreOptions,
    tasks: Vec<Task>,
    columns: Vec<ColumnDescriptor>,
    undo: UndoBuffer,
    initialized: bool,
    subscribers: Vec<mpsc::Sender<StoreEvent>>,
}

impl<S: Storage> TaskStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_options(storage, StoreOptions::default())
    }

    pub fn with_options(storage: S, options: StoreOptions) -> Self {
        TaskStore {
            storage,
            options,
            tasks: Vec::new(),
            columns: Vec::new(),
            undo: UndoBuffer::new(),
            initialized: false,
            subscribers: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn has_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn undo_snapshot(&self) -> Option<&UndoSnapshot> {
        self.undo.peek()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// A blank record pre-filled with the current custom field defaults
    pub fn draft(&self, title: impl Into<String>) -> NewTask {
        NewTask::from_schema(title, &self.columns)
    }

    /// Receive a `StoreEvent` for every change from now on.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Load tasks and columns from storage. Each key is seeded from the
    /// bundled defaults only when it is absent itself; stored tasks are never
    /// replaced. Safe to call again: it re-reads storage, which after the
    /// first call holds exactly what memory does.
    pub fn initialize(&mut self) -> Result<(), StoreError> {
        let stored_tasks = self.storage.get(TASKS_KEY)?;
        let stored_columns = self.storage.get(COLUMNS_KEY)?;

        let (mut tasks, seeded_tasks) = match stored_tasks {
            Some(json) => (decode::<Vec<Task>>(TASKS_KEY, &json)?, false),
            None => {
                let tasks = seed::default_tasks().map_err(|e| StoreError::Corrupt {
                    key: TASKS_KEY.to_string(),
                    source: e,
                })?;
                (tasks, true)
            }
        };
        let (columns, seeded_columns) = match stored_columns {
            Some(json) => (decode::<Vec<ColumnDescriptor>>(COLUMNS_KEY, &json)?, false),
            None => {
                let defaults = seed::default_columns().map_err(|e| StoreError::Corrupt {
                    key: COLUMNS_KEY.to_string(),
                    source: e,
                })?;
                // Tasks saved without a schema keep their extra keys as columns
                (schema::infer_columns(defaults, &tasks), true)
            }
        };

        let repaired = schema::reconcile(&mut tasks, &columns);
        if repaired > 0 {
            tracing::warn!(repaired, "stored tasks did not match the column schema; repaired");
        }

        let mut writes = Vec::new();
        if seeded_tasks || repaired > 0 {
            writes.push((TASKS_KEY, Some(encode(TASKS_KEY, &tasks)?)));
        }
        if seeded_columns {
            writes.push((COLUMNS_KEY, Some(encode(COLUMNS_KEY, &columns)?)));
        }
        self.write_all(&writes)?;
        if seeded_tasks {
            tracing::info!(tasks = tasks.len(), "seeded storage with default tasks");
        }
        if seeded_columns {
            tracing::info!(columns = columns.len(), "seeded storage with the column schema");
        }

        if self.options.persist_undo {
            self.undo = match self.storage.get(UNDO_KEY)? {
                Some(json) => match serde_json::from_str::<UndoBuffer>(&json) {
                    Ok(mut buffer) => {
                        if let Some(mut snapshot) = buffer.take() {
                            schema::reconcile(&mut snapshot.tasks, &columns);
                            buffer.record(snapshot);
                        }
                        buffer
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding unreadable undo state");
                        UndoBuffer::new()
                    }
                },
                None => UndoBuffer::new(),
            };
        }

        self.tasks = tasks;
        self.columns = columns;
        self.initialized = true;
        tracing::debug!(
            tasks = self.tasks.len(),
            columns = self.columns.len(),
            "store initialized"
        );
        self.notify(StoreEvent::Loaded);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Task CRUD
    // -----------------------------------------------------------------------

    /// Add a task. The record must carry every custom field (see `draft`).
    /// Returns the id, assigned as one past the largest in use when absent.
    pub fn add_task(&mut self, record: NewTask) -> Result<TaskId, StoreError> {
        self.ensure_initialized()?;
        schema::validate_new_task(&record, &self.columns, &self.tasks)?;

        let id = match record.id {
            Some(id) => id,
            None => schema::next_task_id(&self.tasks)?,
        };
        let task = record.into_task(id);
        let mut tasks = self.tasks.clone();
        match self.options.insert {
            InsertPosition::Top => tasks.insert(0, task),
            InsertPosition::Bottom => tasks.push(task),
        }

        self.commit(Commit {
            tasks: Some(tasks),
            ..Commit::default()
        })?;
        tracing::debug!(%id, "task added");
        Ok(id)
    }

    /// Merge `patch` into the task with `id`. Unknown id is a no-op.
    pub fn update_task(&mut self, id: TaskId, patch: &TaskPatch) -> Result<(), StoreError> {
        self.ensure_initialized()?;
        schema::validate_patch(patch, &self.columns)?;

        let Some(idx) = self.tasks.iter().position(|t| t.id == id) else {
            tracing::debug!(%id, "update ignored: no such task");
            return Ok(());
        };
        if patch.is_empty() {
            return Ok(());
        }

        let mut tasks = self.tasks.clone();
        tasks[idx].apply(patch);
        self.commit(Commit {
            tasks: Some(tasks),
            ..Commit::default()
        })?;
        tracing::debug!(%id, "task updated");
        Ok(())
    }

    /// Remove the task with `id`. Unknown id is a no-op.
    pub fn delete_task(&mut self, id: TaskId) -> Result<(), StoreError> {
        self.ensure_initialized()?;
        if self.task(id).is_none() {
            tracing::debug!(%id, "delete ignored: no such task");
            return Ok(());
        }

        let tasks: Vec<Task> = self.tasks.iter().filter(|t| t.id != id).cloned().collect();
        self.commit(Commit {
            tasks: Some(tasks),
            ..Commit::default()
        })?;
        tracing::debug!(%id, "task deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk operations and undo
    // -----------------------------------------------------------------------

    /// Apply `patch` to every selected task. The previous collection becomes
    /// the undo snapshot, replacing any earlier one.
    pub fn bulk_edit(&mut self, ids: &[TaskId], patch: &TaskPatch) -> Result<(), StoreError> {
        self.ensure_initialized()?;
        if ids.is_empty() {
            return Err(StoreError::NoSelection);
        }
        schema::validate_patch(patch, &self.columns)?;

        let selected: HashSet<TaskId> = ids.iter().copied().collect();
        let mut tasks = self.tasks.clone();
        let mut affected = 0;
        for task in tasks.iter_mut().filter(|t| selected.contains(&t.id)) {
            task.apply(patch);
            affected += 1;
        }

        self.commit_bulk(tasks, BulkKind::Edit, affected)?;
        tracing::debug!(affected, "bulk edit applied");
        Ok(())
    }

    /// Remove every selected task. The previous collection becomes the undo
    /// snapshot, replacing any earlier one.
    pub fn bulk_delete(&mut self, ids: &[TaskId]) -> Result<(), StoreError> {
        self.ensure_initialized()?;
        if ids.is_empty() {
            return Err(StoreError::NoSelection);
        }

        let selected: HashSet<TaskId> = ids.iter().copied().collect();
        let tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| !selected.contains(&t.id))
            .cloned()
            .collect();
        let affected = self.tasks.len() - tasks.len();

        self.commit_bulk(tasks, BulkKind::Delete, affected)?;
        tracing::debug!(affected, "bulk delete applied");
        Ok(())
    }

    /// Restore the collection saved by the last bulk operation.
    /// Returns false (and changes nothing) when there is nothing to undo.
    pub fn execute_undo(&mut self) -> Result<bool, StoreError> {
        self.ensure_initialized()?;
        let Some(snapshot) = self.undo.peek() else {
            return Ok(false);
        };

        // Columns may have changed since the snapshot was taken
        let mut tasks = snapshot.tasks.clone();
        schema::reconcile(&mut tasks, &self.columns);
        let kind = snapshot.kind;

        self.commit(Commit {
            tasks: Some(tasks),
            undo: Some(UndoBuffer::new()),
            ..Commit::default()
        })?;
        tracing::debug!(?kind, "bulk operation undone");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Custom fields
    // -----------------------------------------------------------------------

    /// Add a custom column and give every task a value for it: `field_value`
    /// for the task named by `task_id`, `default_value` for all others.
    pub fn add_custom_field(
        &mut self,
        task_id: Option<TaskId>,
        field_name: &str,
        field_value: FieldValue,
        default_value: FieldValue,
        field_type: FieldType,
    ) -> Result<(), StoreError> {
        self.ensure_initialized()?;
        let name = field_name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyFieldName.into());
        }
        if schema::field_exists(&self.columns, name) {
            return Err(StoreError::FieldExists(name.to_string()));
        }
        schema::check_type(name, field_type, &default_value)?;
        if task_id.is_some() {
            schema::check_type(name, field_type, &field_value)?;
        }

        let mut columns = self.columns.clone();
        columns.push(ColumnDescriptor::custom(name, field_type, default_value.clone()));

        let mut tasks = self.tasks.clone();
        for task in &mut tasks {
            let value = if Some(task.id) == task_id {
                field_value.clone()
            } else {
                default_value.clone()
            };
            task.fields.insert(name.to_string(), value);
        }

        self.commit(Commit {
            tasks: Some(tasks),
            columns: Some(columns),
            ..Commit::default()
        })?;
        tracing::debug!(field = name, %field_type, "custom field added");
        Ok(())
    }

    /// Drop a custom column and strip it from every task. Built-in columns
    /// are rejected; an unknown name is a no-op.
    pub fn delete_custom_field(&mut self, field_name: &str) -> Result<(), StoreError> {
        self.ensure_initialized()?;
        let Some(column) = self.columns.iter().find(|c| c.matches_name(field_name)) else {
            tracing::debug!(field = field_name, "delete ignored: no such field");
            return Ok(());
        };
        if !column.custom {
            return Err(ValidationError::BuiltinColumn(column.field.clone()).into());
        }
        let field = column.field.clone();

        let columns: Vec<ColumnDescriptor> = self
            .columns
            .iter()
            .filter(|c| c.field != field)
            .cloned()
            .collect();
        let mut tasks = self.tasks.clone();
        for task in &mut tasks {
            task.fields.shift_remove(&field);
        }

        self.commit(Commit {
            tasks: Some(tasks),
            columns: Some(columns),
            ..Commit::default()
        })?;
        tracing::debug!(field = %field, "custom field deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.initialized {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    fn commit_bulk(&mut self, tasks: Vec<Task>, kind: BulkKind, affected: usize) -> Result<(), StoreError> {
        let mut undo = UndoBuffer::new();
        undo.record(UndoSnapshot {
            kind,
            affected,
            tasks: self.tasks.clone(),
        });
        self.commit(Commit {
            tasks: Some(tasks),
            undo: Some(undo),
            ..Commit::default()
        })
    }

    /// Write the changed keys, then swap the new state into memory.
    fn commit(&mut self, commit: Commit) -> Result<(), StoreError> {
        let mut writes: Vec<(&'static str, Option<String>)> = Vec::new();
        if let Some(tasks) = &commit.tasks {
            writes.push((TASKS_KEY, Some(encode(TASKS_KEY, tasks)?)));
        }
        if let Some(columns) = &commit.columns {
            writes.push((COLUMNS_KEY, Some(encode(COLUMNS_KEY, columns)?)));
        }
        if self.options.persist_undo
            && let Some(undo) = &commit.undo
        {
            let value = if undo.is_empty() {
                None
            } else {
                Some(encode(UNDO_KEY, undo)?)
            };
            writes.push((UNDO_KEY, value));
        }
        self.write_all(&writes)?;

        let mut events = Vec::new();
        if let Some(tasks) = commit.tasks {
            self.tasks = tasks;
            events.push(StoreEvent::TasksChanged);
        }
        if let Some(columns) = commit.columns {
            self.columns = columns;
            events.push(StoreEvent::ColumnsChanged);
        }
        if let Some(undo) = commit.undo
            && undo != self.undo
        {
            self.undo = undo;
            events.push(StoreEvent::UndoChanged);
        }
        for event in events {
            self.notify(event);
        }
        Ok(())
    }

    /// Write (or remove, for `None`) each key in order. If one fails, keys
    /// already written are put back to their previous values.
    fn write_all(&mut self, writes: &[(&'static str, Option<String>)]) -> Result<(), StoreError> {
        let mut previous: Vec<(&'static str, Option<String>)> = Vec::with_capacity(writes.len());
        for (key, value) in writes {
            let result = match self.storage.get(key) {
                Ok(before) => {
                    previous.push((*key, before));
                    match value {
                        Some(value) => self.storage.set(key, value),
                        None => self.storage.remove(key),
                    }
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(key = *key, error = %e, "write failed; rolling back");
                self.rollback(previous);
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn rollback(&mut self, mut previous: Vec<(&'static str, Option<String>)>) {
        while let Some((key, before)) = previous.pop() {
            let result = match &before {
                Some(value) => self.storage.set(key, value),
                None => self.storage.remove(key),
            };
            if let Err(e) = result {
                tracing::warn!(key, error = %e, "rollback failed; storage may disagree with memory until the next save");
            }
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        source: e,
    })
}

fn decode<T: DeserializeOwned>(key: &str, json: &str) -> Result<T, StoreError> {
    serde_json::from_str(json).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStorage;
    use crate::model::{Priority, TaskStatus};
    use pretty_assertions::assert_eq;

    fn one_task_storage() -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                TASKS_KEY,
                r#"[{"id":1,"title":"Write spec","status":"not_started","priority":"high"}]"#,
            )
            .unwrap();
        storage
            .set(
                COLUMNS_KEY,
                &serde_json::to_string(&crate::model::builtin_columns()).unwrap(),
            )
            .unwrap();
        storage
    }

    fn loaded(storage: MemoryStorage) -> TaskStore<MemoryStorage> {
        let mut store = TaskStore::new(storage);
        store.initialize().unwrap();
        store
    }

    fn stored_tasks(store: &TaskStore<MemoryStorage>) -> Vec<Task> {
        serde_json::from_str(&store.storage().get(TASKS_KEY).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn initialize_seeds_empty_storage() {
        let store = loaded(MemoryStorage::new());
        assert_eq!(store.tasks(), seed::default_tasks().unwrap().as_slice());
        assert_eq!(store.columns(), seed::default_columns().unwrap().as_slice());
        assert!(store.storage().get(TASKS_KEY).unwrap().is_some());
        assert!(store.storage().get(COLUMNS_KEY).unwrap().is_some());
    }

    #[test]
    fn initialize_seeds_only_the_missing_key() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "[]").unwrap();
        let store = loaded(storage);
        assert!(store.tasks().is_empty());
        assert_eq!(store.columns(), seed::default_columns().unwrap().as_slice());
        assert_eq!(store.storage().get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(store.storage().get(COLUMNS_KEY).unwrap().is_some());

        let mut storage = MemoryStorage::new();
        storage
            .set(COLUMNS_KEY, &serde_json::to_string(&crate::model::builtin_columns()).unwrap())
            .unwrap();
        let store = loaded(storage);
        assert_eq!(store.tasks(), seed::default_tasks().unwrap().as_slice());
    }

    #[test]
    fn tasks_without_a_schema_keep_their_values() {
        let mut storage = MemoryStorage::new();
        storage
            .set(
                TASKS_KEY,
                r#"[{"id":42,"title":"My real task","status":"in_progress","priority":"low","estimate":3}]"#,
            )
            .unwrap();
        let store = loaded(storage);

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].title, "My real task");
        assert_eq!(store.tasks()[0].fields["estimate"], FieldValue::Number(3.0));
        let column = store.columns().last().unwrap();
        assert_eq!((column.field.as_str(), column.field_type), ("estimate", FieldType::Number));
        assert_eq!(stored_tasks(&store), store.tasks());
    }

    #[test]
    fn null_field_values_are_repaired_and_written_back() {
        let mut columns = crate::model::builtin_columns();
        columns.push(ColumnDescriptor::custom("notes", FieldType::Text, "none yet".into()));
        let mut storage = MemoryStorage::new();
        storage
            .set(
                TASKS_KEY,
                r#"[{"id":1,"title":"Write spec","status":"not_started","priority":"high","notes":null}]"#,
            )
            .unwrap();
        storage.set(COLUMNS_KEY, &serde_json::to_string(&columns).unwrap()).unwrap();

        let store = loaded(storage);
        assert_eq!(
            store.task(TaskId(1)).unwrap().fields["notes"],
            FieldValue::Text("none yet".into())
        );
        assert_eq!(stored_tasks(&store), store.tasks());
    }

    #[test]
    fn clean_load_writes_nothing() {
        let mut store = TaskStore::new(one_task_storage());
        // Any write would fail, so a successful load proves none was attempted
        store.storage_mut().set_quota(Some(0));
        store.initialize().unwrap();
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn add_task_reports_exhausted_ids() {
        let mut storage = one_task_storage();
        storage
            .set(
                TASKS_KEY,
                &format!(r#"[{{"id":{},"title":"Last","status":"not_started","priority":"low"}}]"#, u64::MAX),
            )
            .unwrap();
        let mut store = loaded(storage);
        let err = store.add_task(store.draft("One more")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::IdsExhausted(_))));
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn initialize_twice_keeps_data() {
        let mut store = loaded(one_task_storage());
        store.add_task(store.draft("Second")).unwrap();
        let before = store.tasks().to_vec();
        store.initialize().unwrap();
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn corrupt_storage_is_reported_not_overwritten() {
        let mut storage = MemoryStorage::new();
        storage.set(TASKS_KEY, "{not json").unwrap();
        storage.set(COLUMNS_KEY, "[]").unwrap();
        let mut store = TaskStore::new(storage);
        let err = store.initialize().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { ref key, .. } if key == TASKS_KEY));
        assert_eq!(store.storage().get(TASKS_KEY).unwrap().as_deref(), Some("{not json"));
        assert!(!store.is_initialized());
    }

    #[test]
    fn mutations_require_initialize() {
        let mut store = TaskStore::new(MemoryStorage::new());
        assert!(matches!(
            store.add_task(NewTask::from_schema("x", &[])),
            Err(StoreError::NotInitialized)
        ));
    }

    #[test]
    fn add_task_appends_and_assigns_id() {
        let mut store = loaded(one_task_storage());
        let id = store.add_task(store.draft("Review")).unwrap();
        assert_eq!(id, TaskId(2));
        assert_eq!(store.tasks()[1].title, "Review");
        assert_eq!(stored_tasks(&store), store.tasks());
    }

    #[test]
    fn add_task_prepends_when_configured() {
        let mut store = TaskStore::with_options(
            one_task_storage(),
            StoreOptions {
                insert: InsertPosition::Top,
                persist_undo: false,
            },
        );
        store.initialize().unwrap();
        store.add_task(store.draft("Review")).unwrap();
        assert_eq!(store.tasks()[0].title, "Review");
    }

    #[test]
    fn add_task_rejects_empty_title() {
        let mut store = loaded(one_task_storage());
        let err = store.add_task(store.draft("  ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::EmptyTitle)));
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn update_merges_and_ignores_unknown_id() {
        let mut store = loaded(one_task_storage());
        store
            .update_task(TaskId(1), &TaskPatch::default().status(TaskStatus::InProgress))
            .unwrap();
        let task = store.task(TaskId(1)).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::High);

        let before = store.tasks().to_vec();
        store
            .update_task(TaskId(99), &TaskPatch::default().title("ghost"))
            .unwrap();
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn delete_removes_and_ignores_unknown_id() {
        let mut store = loaded(one_task_storage());
        store.delete_task(TaskId(99)).unwrap();
        assert_eq!(store.tasks().len(), 1);
        store.delete_task(TaskId(1)).unwrap();
        assert!(store.tasks().is_empty());
        assert!(stored_tasks(&store).is_empty());
    }

    #[test]
    fn bulk_delete_then_undo_restores_exactly() {
        let mut store = loaded(one_task_storage());
        let original = store.tasks().to_vec();

        store.bulk_delete(&[TaskId(1)]).unwrap();
        assert!(store.tasks().is_empty());
        assert!(store.has_undo());
        assert_eq!(store.undo_snapshot().unwrap().affected, 1);

        assert!(store.execute_undo().unwrap());
        assert_eq!(store.tasks(), original.as_slice());
        assert_eq!(stored_tasks(&store), original);
        assert!(!store.has_undo());
        assert!(!store.execute_undo().unwrap());
    }

    #[test]
    fn bulk_on_empty_selection_reports_no_selection() {
        let mut store = loaded(one_task_storage());
        let patch = TaskPatch::default().priority(Priority::Low);
        assert!(matches!(store.bulk_edit(&[], &patch), Err(StoreError::NoSelection)));
        assert!(matches!(store.bulk_delete(&[]), Err(StoreError::NoSelection)));
        assert!(!store.has_undo());
    }

    #[test]
    fn add_custom_field_backfills_and_sets_one_task() {
        let mut store = loaded(MemoryStorage::new());
        store
            .add_custom_field(
                Some(TaskId(2)),
                "estimate",
                FieldValue::Number(5.0),
                FieldValue::Number(0.0),
                FieldType::Number,
            )
            .unwrap();

        for task in store.tasks() {
            let expected = if task.id == TaskId(2) { 5.0 } else { 0.0 };
            assert_eq!(task.fields["estimate"], FieldValue::Number(expected));
        }
        let column = store.columns().last().unwrap();
        assert!(column.custom);
        assert_eq!(column.label, "estimate");
    }

    #[test]
    fn add_custom_field_rejects_collisions() {
        let mut store = loaded(one_task_storage());
        let err = store
            .add_custom_field(None, "Title", "".into(), "".into(), FieldType::Text)
            .unwrap_err();
        assert!(matches!(err, StoreError::FieldExists(ref name) if name == "Title"));
        assert_eq!(store.columns().len(), 4);
    }

    #[test]
    fn delete_builtin_field_is_rejected() {
        let mut store = loaded(one_task_storage());
        let err = store.delete_custom_field("status").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::BuiltinColumn(_))
        ));
    }

    #[test]
    fn failed_write_leaves_state_unchanged() {
        let mut store = loaded(one_task_storage());
        store.storage_mut().set_unavailable(true);
        let before = store.tasks().to_vec();

        let err = store.add_task(store.draft("Lost?")).unwrap_err();
        assert!(matches!(err, StoreError::Storage(StorageError::Unavailable(_))));
        assert_eq!(store.tasks(), before.as_slice());

        store.storage_mut().set_unavailable(false);
        assert_eq!(stored_tasks(&store), before);
    }

    #[test]
    fn quota_failure_on_second_key_rolls_back_first() {
        let mut store = loaded(one_task_storage());
        let tasks_before = store.storage().get(TASKS_KEY).unwrap();
        let used = store.storage().used_bytes();
        // Room for the larger tasks value but not for both
        store.storage_mut().set_quota(Some(used + 20));

        let err = store
            .add_custom_field(None, "owner", "".into(), "nobody".into(), FieldType::Text)
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(StorageError::QuotaExceeded { .. })));
        assert_eq!(store.storage().get(TASKS_KEY).unwrap(), tasks_before);
        assert_eq!(store.columns().len(), 4);
        assert!(store.tasks()[0].fields.is_empty());
    }

    #[test]
    fn subscribers_hear_about_changes_only() {
        let mut store = TaskStore::new(one_task_storage());
        let rx = store.subscribe();
        store.initialize().unwrap();
        store.delete_task(TaskId(42)).unwrap();
        store.bulk_delete(&[TaskId(1)]).unwrap();

        let events: Vec<StoreEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                StoreEvent::Loaded,
                StoreEvent::TasksChanged,
                StoreEvent::UndoChanged
            ]
        );
    }

    #[test]
    fn persisted_undo_survives_restart() {
        let options = StoreOptions {
            insert: InsertPosition::Bottom,
            persist_undo: true,
        };
        let mut store = TaskStore::with_options(one_task_storage(), options.clone());
        store.initialize().unwrap();
        store.bulk_delete(&[TaskId(1)]).unwrap();

        let storage = store.storage().clone();
        let mut reopened = TaskStore::with_options(storage, options);
        reopened.initialize().unwrap();
        assert!(reopened.has_undo());
        assert!(reopened.execute_undo().unwrap());
        assert_eq!(reopened.tasks().len(), 1);
        assert!(reopened.storage().get(UNDO_KEY).unwrap().is_none());
    }

    #[test]
    fn undo_after_schema_change_keeps_columns_consistent() {
        let mut store = loaded(one_task_storage());
        store.bulk_delete(&[TaskId(1)]).unwrap();
        store
            .add_custom_field(None, "owner", "".into(), "me".into(), FieldType::Text)
            .unwrap();
        store.execute_undo().unwrap();
        assert_eq!(
            store.task(TaskId(1)).unwrap().fields["owner"],
            FieldValue::Text("me".into())
        );
    }
}
