use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::model::{ColumnDescriptor, FieldType, FieldValue, Priority, Task};
use crate::ops::schema::find_column;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            _ => Err(format!("invalid sort direction: {} (expected asc or desc)", s)),
        }
    }
}

/// Column and direction to order the table by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        SortSpec {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// How two values of the sort column are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    PriorityRank,
    Numeric,
    Lexical,
}

fn key_kind(field: &str, columns: &[ColumnDescriptor]) -> Option<KeyKind> {
    if field == "priority" {
        return Some(KeyKind::PriorityRank);
    }
    find_column(columns, field).map(|c| match c.field_type {
        FieldType::Number => KeyKind::Numeric,
        FieldType::Text | FieldType::Boolean => KeyKind::Lexical,
    })
}

/// Order tasks in place. `None` leaves the order alone. Ties keep their
/// input order, so a page shows the same rows on every render.
pub fn sort_tasks(tasks: &mut [&Task], sort: Option<&SortSpec>, columns: &[ColumnDescriptor]) {
    let Some(sort) = sort else {
        return;
    };
    let kind = key_kind(&sort.field, columns);
    // slice::sort_by is stable
    tasks.sort_by(|a, b| {
        let ord = compare(a.get(&sort.field), b.get(&sort.field), kind);
        match sort.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}

/// Missing values order below any present value.
fn compare(a: Option<FieldValue>, b: Option<FieldValue>, kind: Option<KeyKind>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_present(&a, &b, kind),
    }
}

fn compare_present(a: &FieldValue, b: &FieldValue, kind: Option<KeyKind>) -> Ordering {
    let kind = kind.unwrap_or(match (a, b) {
        (FieldValue::Number(_), FieldValue::Number(_)) => KeyKind::Numeric,
        _ => KeyKind::Lexical,
    });
    match kind {
        KeyKind::PriorityRank => {
            let rank = |v: &FieldValue| Priority::parse_lenient(&v.to_string()).rank();
            rank(a).cmp(&rank(b))
        }
        KeyKind::Numeric => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            // A non-number in a number column sorts like a missing value
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => a.to_string().cmp(&b.to_string()),
        },
        KeyKind::Lexical => a.to_string().cmp(&b.to_string()),
    }
}
