use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Unique, immutable task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaskId)
    }
}

/// Task progress state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    /// A value read from storage that is not one of the known states.
    /// Kept verbatim so a reload never loses data.
    Unrecognized(String),
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Unrecognized(s) => s,
        }
    }

    /// Case-insensitive parse; unknown text becomes `Unrecognized`
    pub fn parse_lenient(s: &str) -> TaskStatus {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "not_started" => TaskStatus::NotStarted,
            "in_progress" => TaskStatus::InProgress,
            "completed" => TaskStatus::Completed,
            _ => TaskStatus::Unrecognized(s.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, TaskStatus::Unrecognized(_))
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        TaskStatus::parse_lenient(&s)
    }
}

impl From<TaskStatus> for String {
    fn from(s: TaskStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match TaskStatus::parse_lenient(s) {
            TaskStatus::Unrecognized(_) => Err(format!(
                "invalid status: {} (expected not_started, in_progress, completed)",
                s
            )),
            status => Ok(status),
        }
    }
}

/// Task urgency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Urgent,
    Unrecognized(String),
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::None,
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
            Priority::Unrecognized(s) => s,
        }
    }

    /// Sort rank: urgent highest, unrecognized below `none`
    pub fn rank(&self) -> i32 {
        match self {
            Priority::Urgent => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
            Priority::None => 0,
            Priority::Unrecognized(_) => -1,
        }
    }

    pub fn parse_lenient(s: &str) -> Priority {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Priority::None,
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Unrecognized(s.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Priority::Unrecognized(_))
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::parse_lenient(&s)
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Priority::parse_lenient(s) {
            Priority::Unrecognized(_) => Err(format!(
                "invalid priority: {} (expected none, low, medium, high, urgent)",
                s
            )),
            priority => Ok(priority),
        }
    }
}

/// Value held by a task field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn field_type(&self) -> crate::model::FieldType {
        use crate::model::FieldType;
        match self {
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Number(_) => FieldType::Number,
            FieldValue::Text(_) => FieldType::Text,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

/// A task record: four built-in fields plus the custom fields of the schema.
///
/// Serializes to a single flat JSON object, custom keys after the built-ins.
/// A `null` custom value reads as missing, so the load-time schema repair
/// fills in the column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredTask")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Custom field values, in schema order
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldValue>,
}

/// Wire shape of a task as read from storage
#[derive(Deserialize)]
struct StoredTask {
    id: TaskId,
    title: String,
    status: TaskStatus,
    priority: Priority,
    #[serde(flatten)]
    fields: IndexMap<String, Option<FieldValue>>,
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        Task {
            id: stored.id,
            title: stored.title,
            status: stored.status,
            priority: stored.priority,
            fields: stored
                .fields
                .into_iter()
                .filter_map(|(name, value)| value.map(|v| (name, v)))
                .collect(),
        }
    }
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, status: TaskStatus, priority: Priority) -> Self {
        Task {
            id,
            title: title.into(),
            status,
            priority,
            fields: IndexMap::new(),
        }
    }

    /// Look up any field by name, built-in or custom.
    ///
    /// Built-ins come back as their natural value (`id` as a number, the rest
    /// as text) so filters and sorts can treat every column the same way.
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Number(self.id.0 as f64)),
            "title" => Some(FieldValue::Text(self.title.clone())),
            "status" => Some(FieldValue::Text(self.status.as_str().to_string())),
            "priority" => Some(FieldValue::Text(self.priority.as_str().to_string())),
            other => self.fields.get(other).cloned(),
        }
    }

    /// Apply a patch in place. Callers validate the patch first.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
        if let Some(priority) = &patch.priority {
            self.priority = priority.clone();
        }
        for (key, value) in &patch.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// Input record for `add_task`. `id` is assigned by the store when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub id: Option<TaskId>,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub fields: IndexMap<String, FieldValue>,
}

impl NewTask {
    /// A blank record carrying every custom field at its column default,
    /// the way the create form pre-fills itself.
    pub fn from_schema(title: impl Into<String>, columns: &[crate::model::ColumnDescriptor]) -> Self {
        let fields = columns
            .iter()
            .filter(|c| c.custom)
            .map(|c| {
                let value = c
                    .default_value
                    .clone()
                    .unwrap_or_else(|| c.field_type.empty_value());
                (c.field.clone(), value)
            })
            .collect();
        NewTask {
            id: None,
            title: title.into(),
            status: TaskStatus::NotStarted,
            priority: Priority::Medium,
            fields,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            status: self.status,
            priority: self.priority,
            fields: self.fields,
        }
    }
}

/// A partial record merged into existing tasks by `update_task` and `bulk_edit`.
/// `id` is deliberately absent: ids never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub fields: IndexMap<String, FieldValue>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.fields.is_empty()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn field(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}
