use serde::{Deserialize, Serialize};

use crate::model::Task;

/// What the buffered snapshot undoes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkKind {
    Edit,
    Delete,
}

/// Collection state saved before a bulk mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSnapshot {
    pub kind: BulkKind,
    /// Number of tasks the bulk mutation touched
    pub affected: usize,
    pub tasks: Vec<Task>,
}

/// Single-level undo: one optional snapshot, overwritten by the next bulk
/// mutation and consumed by `take`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoBuffer {
    slot: Option<UndoSnapshot>,
}

impl UndoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn peek(&self) -> Option<&UndoSnapshot> {
        self.slot.as_ref()
    }

    /// Replace whatever is buffered
    pub fn record(&mut self, snapshot: UndoSnapshot) {
        self.slot = Some(snapshot);
    }

    pub fn take(&mut self) -> Option<UndoSnapshot> {
        self.slot.take()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}
