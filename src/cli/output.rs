use serde::Serialize;

use crate::model::{ColumnDescriptor, Task, label_from_field};
use crate::ops::view::Page;
use crate::util::unicode::{display_width, pad_to_width};

/// Widest a text cell may grow before it is truncated
const MAX_CELL_WIDTH: usize = 40;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PageJson<'a> {
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
    pub tasks: Vec<&'a Task>,
}

pub fn page_to_json<'a>(page: &Page<&'a Task>) -> PageJson<'a> {
    PageJson {
        page: page.current_page,
        total_pages: page.total_pages,
        total: page.total,
        tasks: page.items.clone(),
    }
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// Cell text for one field of a task; blank when the task has no value
pub fn cell_text(task: &Task, field: &str) -> String {
    task.get(field).map(|v| v.to_string()).unwrap_or_default()
}

/// Render tasks as an aligned table, one header row plus one row per task.
pub fn format_table(tasks: &[&Task], columns: &[ColumnDescriptor]) -> Vec<String> {
    let headers: Vec<String> = columns.iter().map(|c| column_header(c)).collect();
    let rows: Vec<Vec<String>> = tasks
        .iter()
        .map(|task| columns.iter().map(|c| cell_text(task, &c.field)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .map(|row| display_width(&row[i]))
                .chain(std::iter::once(display_width(header)))
                .max()
                .unwrap_or(0)
                .min(MAX_CELL_WIDTH)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&headers, &widths));
    for row in &rows {
        lines.push(format_row(row, &widths));
    }
    lines
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| pad_to_width(cell, *width))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Custom columns store `label == field`; show them the way the form labels them
fn column_header(column: &ColumnDescriptor) -> String {
    if column.custom {
        label_from_field(&column.label)
    } else {
        column.label.clone()
    }
}

pub fn format_page_footer<T>(page: &Page<T>) -> String {
    format!(
        "page {}/{} · {} task{}",
        page.current_page,
        page.total_pages,
        page.total,
        if page.total == 1 { "" } else { "s" }
    )
}

/// Format detailed task view, one `label: value` line per column
pub fn format_task_detail(task: &Task, columns: &[ColumnDescriptor]) -> Vec<String> {
    let labels: Vec<String> = columns.iter().map(column_header).collect();
    let width = labels.iter().map(|l| display_width(l)).max().unwrap_or(0);
    columns
        .iter()
        .zip(&labels)
        .map(|(column, label)| {
            format!(
                "{}  {}",
                pad_to_width(&format!("{}:", label), width + 1),
                cell_text(task, &column.field)
            )
        })
        .collect()
}

/// Format the column list for `tt field list`
pub fn format_columns(columns: &[ColumnDescriptor]) -> Vec<String> {
    columns
        .iter()
        .map(|c| {
            let default = c
                .default_value
                .as_ref()
                .map(|v| format!(" (default: {})", v))
                .unwrap_or_default();
            let kind = if c.custom { "custom" } else { "built-in" };
            format!("{}  {} [{}]{}", c.field, c.field_type, kind, default)
        })
        .collect()
}
