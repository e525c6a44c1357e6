mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::storage::FileStorage;
use crate::model::{
    AppConfig, ColumnDescriptor, FieldType, FieldValue, Priority, TaskId, TaskPatch, TaskStatus,
    field_name_from_label,
};
use crate::ops::store::{StoreOptions, TaskStore};
use crate::ops::undo::BulkKind;
use crate::ops::view::{SortSpec, TaskFilter, ViewState};

/// Where task data lives when `-C` is not given
pub const DEFAULT_DATA_DIR: &str = ".tasktable";

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let data_dir = cli
        .data_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    match cli.command {
        Commands::Init => cmd_init(&data_dir),

        // Read commands
        Commands::List(args) => cmd_list(&data_dir, args, json),
        Commands::Show(args) => cmd_show(&data_dir, args, json),

        // Write commands
        Commands::Add(args) => cmd_add(&data_dir, args),
        Commands::Update(args) => cmd_update(&data_dir, args),
        Commands::Delete(args) => cmd_delete(&data_dir, args),
        Commands::BulkEdit(args) => cmd_bulk_edit(&data_dir, args),
        Commands::BulkDelete(args) => cmd_bulk_delete(&data_dir, args),
        Commands::Undo => cmd_undo(&data_dir),

        Commands::Field(cmd) => match cmd.action {
            FieldAction::Add(args) => cmd_field_add(&data_dir, args),
            FieldAction::Rm(args) => cmd_field_rm(&data_dir, args),
            FieldAction::List => cmd_field_list(&data_dir, json),
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load config and open the store. Each CLI run is a cold start, so the undo
/// buffer is persisted alongside the tasks.
fn open_store(data_dir: &Path) -> Result<(TaskStore<FileStorage>, AppConfig), Box<dyn std::error::Error>> {
    let config = config_io::read_config(data_dir)?;
    let storage = FileStorage::open(data_dir)?;
    let mut store = TaskStore::with_options(
        storage,
        StoreOptions {
            insert: config.tasks.insert,
            persist_undo: true,
        },
    );
    store.initialize()?;
    Ok((store, config))
}

/// Find a column by field name or by its display label ("Due Date")
fn resolve_column<'a>(columns: &'a [ColumnDescriptor], name: &str) -> Option<&'a ColumnDescriptor> {
    let from_label = field_name_from_label(name);
    columns
        .iter()
        .find(|c| c.matches_name(name) || c.matches_name(&from_label))
}

fn split_assignment(raw: &str) -> Result<(&str, &str), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim(), value)),
        _ => Err(format!("expected FIELD=VALUE, got: {}", raw)),
    }
}

/// Parse repeated `field=value` arguments, typing each value by its column.
fn parse_field_values(
    raw: &[String],
    columns: &[ColumnDescriptor],
) -> Result<IndexMap<String, FieldValue>, Box<dyn std::error::Error>> {
    let mut fields = IndexMap::new();
    for item in raw {
        let (name, value) = split_assignment(item)?;
        let column =
            resolve_column(columns, name).ok_or_else(|| format!("unknown field: {}", name))?;
        let value = column.field_type.parse_value(value)?;
        fields.insert(column.field.clone(), value);
    }
    Ok(fields)
}

fn build_patch(
    args: PatchArgs,
    columns: &[ColumnDescriptor],
) -> Result<TaskPatch, Box<dyn std::error::Error>> {
    Ok(TaskPatch {
        title: args.title,
        status: args.status.map(|s| s.parse::<TaskStatus>()).transpose()?,
        priority: args.priority.map(|p| p.parse::<Priority>()).transpose()?,
        fields: parse_field_values(&args.values, columns)?,
    })
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(data_dir: &Path, args: ListArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, config) = open_store(data_dir)?;
    let columns = store.columns();

    let mut view = ViewState::with_page_size(args.page_size.unwrap_or(config.view.page_size));
    view.filter = TaskFilter {
        title: args.title.unwrap_or_default(),
        priorities: args
            .priorities
            .iter()
            .map(|p| p.parse::<Priority>())
            .collect::<Result<_, _>>()?,
        statuses: args
            .statuses
            .iter()
            .map(|s| s.parse::<TaskStatus>())
            .collect::<Result<_, _>>()?,
        fields: parse_field_values(&args.filters, columns)?,
    };
    if let Some(ref name) = args.sort {
        let column =
            resolve_column(columns, name).ok_or_else(|| format!("unknown column: {}", name))?;
        view.sort = Some(if args.desc {
            SortSpec::descending(column.field.clone())
        } else {
            SortSpec::ascending(column.field.clone())
        });
    }
    view.pagination.set_page(args.page);

    let page = view.apply(store.tasks(), columns);
    if json {
        println!("{}", serde_json::to_string_pretty(&page_to_json(&page))?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("no tasks");
    } else {
        for line in format_table(&page.items, columns) {
            println!("{}", line);
        }
    }
    println!("{}", format_page_footer(&page));
    Ok(())
}

fn cmd_show(data_dir: &Path, args: ShowArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _) = open_store(data_dir)?;
    let task = store
        .task(TaskId(args.id))
        .ok_or_else(|| format!("task not found: {}", args.id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        for line in format_task_detail(task, store.columns()) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(data_dir: &Path, args: AddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;

    let mut record = store.draft(args.title);
    if let Some(status) = args.status {
        record = record.with_status(status.parse()?);
    }
    if let Some(priority) = args.priority {
        record = record.with_priority(priority.parse()?);
    }
    for (field, value) in parse_field_values(&args.values, store.columns())? {
        record = record.with_field(field, value);
    }

    let id = store.add_task(record)?;
    println!("{}", id);
    Ok(())
}

fn cmd_update(data_dir: &Path, args: UpdateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;
    let id = TaskId(args.id);
    if store.task(id).is_none() {
        return Err(format!("task not found: {}", id).into());
    }

    let patch = build_patch(args.patch, store.columns())?;
    if patch.is_empty() {
        return Err("nothing to change (use --title, --status, --priority or --set)".into());
    }
    store.update_task(id, &patch)?;
    println!("{} updated", id);
    Ok(())
}

fn cmd_delete(data_dir: &Path, args: DeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;
    let id = TaskId(args.id);
    if store.task(id).is_none() {
        return Err(format!("task not found: {}", id).into());
    }
    store.delete_task(id)?;
    println!("{} deleted", id);
    Ok(())
}

fn cmd_bulk_edit(data_dir: &Path, args: BulkEditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;
    let patch = build_patch(args.patch, store.columns())?;
    if patch.is_empty() {
        return Err("nothing to change (use --title, --status, --priority or --set)".into());
    }

    let ids: Vec<TaskId> = args.ids.into_iter().map(TaskId).collect();
    store.bulk_edit(&ids, &patch)?;
    let affected = store.undo_snapshot().map_or(0, |s| s.affected);
    println!("edited {} task{} (tt undo to revert)", affected, plural(affected));
    Ok(())
}

fn cmd_bulk_delete(data_dir: &Path, args: BulkDeleteArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;
    let ids: Vec<TaskId> = args.ids.into_iter().map(TaskId).collect();
    store.bulk_delete(&ids)?;
    let affected = store.undo_snapshot().map_or(0, |s| s.affected);
    println!("deleted {} task{} (tt undo to revert)", affected, plural(affected));
    Ok(())
}

fn cmd_undo(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;
    let pending = store.undo_snapshot().map(|s| (s.kind, s.affected));

    match pending {
        Some((kind, affected)) if store.execute_undo()? => {
            let action = match kind {
                BulkKind::Edit => "edit",
                BulkKind::Delete => "delete",
            };
            println!("undid bulk {} of {} task{}", action, affected, plural(affected));
        }
        _ => println!("nothing to undo"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Custom fields
// ---------------------------------------------------------------------------

fn cmd_field_add(data_dir: &Path, args: FieldAddArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;

    let field_type: FieldType = args.field_type.parse()?;
    let name = field_name_from_label(&args.label);
    let default_value = match args.default {
        Some(ref raw) => field_type.parse_value(raw)?,
        None => field_type.empty_value(),
    };
    let (task_id, field_value) = match (args.task, args.value) {
        (Some(id), Some(raw)) => {
            let id = TaskId(id);
            if store.task(id).is_none() {
                return Err(format!("task not found: {}", id).into());
            }
            (Some(id), field_type.parse_value(&raw)?)
        }
        _ => (None, default_value.clone()),
    };

    store.add_custom_field(task_id, &name, field_value, default_value, field_type)?;
    println!("{}", name);
    Ok(())
}

fn cmd_field_rm(data_dir: &Path, args: FieldRmArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut store, _) = open_store(data_dir)?;
    let field = resolve_column(store.columns(), &args.name)
        .map(|c| c.field.clone())
        .ok_or_else(|| format!("no such field: {}", args.name))?;
    store.delete_custom_field(&field)?;
    println!("{} removed", field);
    Ok(())
}

fn cmd_field_list(data_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (store, _) = open_store(data_dir)?;
    if json {
        println!("{}", serde_json::to_string_pretty(store.columns())?);
    } else {
        for line in format_columns(store.columns()) {
            println!("{}", line);
        }
    }
    Ok(())
}
