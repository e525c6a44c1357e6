use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::task::FieldValue;

/// Names of the columns every task carries. These are never custom and
/// cannot be deleted.
pub const BUILTIN_FIELDS: [&str; 4] = ["id", "title", "status", "priority"];

/// Value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    /// Older data calls this `checkbox`
    #[serde(alias = "checkbox")]
    Boolean,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        }
    }

    /// The value a field of this type holds when nothing else is given
    pub fn empty_value(self) -> FieldValue {
        match self {
            FieldType::Text => FieldValue::Text(String::new()),
            FieldType::Number => FieldValue::Number(0.0),
            FieldType::Boolean => FieldValue::Boolean(false),
        }
    }

    /// Parse user-entered text into a value of this type
    pub fn parse_value(self, raw: &str) -> Result<FieldValue, String> {
        match self {
            FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldType::Number => raw
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|_| format!("not a number: {}", raw)),
            FieldType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(FieldValue::Boolean(true)),
                "false" | "no" | "0" | "off" => Ok(FieldValue::Boolean(false)),
                _ => Err(format!("not a boolean: {}", raw)),
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "boolean" | "bool" | "checkbox" => Ok(FieldType::Boolean),
            _ => Err(format!(
                "invalid field type: {} (expected text, number, boolean)",
                s
            )),
        }
    }
}

/// One entry of the schema registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub field: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<FieldValue>,
}

impl ColumnDescriptor {
    pub fn builtin(field: &str, label: &str, field_type: FieldType) -> Self {
        ColumnDescriptor {
            field: field.to_string(),
            label: label.to_string(),
            field_type,
            custom: false,
            default_value: None,
        }
    }

    /// A user-defined column. The label is the field name itself.
    pub fn custom(field: &str, field_type: FieldType, default_value: FieldValue) -> Self {
        ColumnDescriptor {
            field: field.to_string(),
            label: field.to_string(),
            field_type,
            custom: true,
            default_value: Some(default_value),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.field.to_lowercase() == name.to_lowercase()
    }
}

/// The column list a fresh install starts with
pub fn builtin_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::builtin("id", "ID", FieldType::Number),
        ColumnDescriptor::builtin("title", "Title", FieldType::Text),
        ColumnDescriptor::builtin("status", "Status", FieldType::Text),
        ColumnDescriptor::builtin("priority", "Priority", FieldType::Text),
    ]
}

pub fn is_builtin_field(name: &str) -> bool {
    BUILTIN_FIELDS.iter().any(|b| b.eq_ignore_ascii_case(name))
}

/// `"Due Date"` → `"due_date"`
pub fn field_name_from_label(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// `"due_date"` → `"Due Date"`
pub fn label_from_field(field: &str) -> String {
    field
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
