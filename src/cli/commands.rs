use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tt", about = concat!("tasktable v", env!("CARGO_PKG_VERSION"), " - tasks in a table"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Data directory (default: .tasktable)
    #[arg(short = 'C', long = "data-dir", global = true)]
    pub data_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory with seed tasks and a default config
    Init,
    /// Show a page of tasks
    List(ListArgs),
    /// Show one task with all its fields
    Show(ShowArgs),
    /// Add a task
    Add(AddArgs),
    /// Change fields of one task
    Update(UpdateArgs),
    /// Delete one task
    Delete(DeleteArgs),
    /// Apply the same change to several tasks (undoable)
    BulkEdit(BulkEditArgs),
    /// Delete several tasks (undoable)
    BulkDelete(BulkDeleteArgs),
    /// Undo the last bulk edit or bulk delete
    Undo,
    /// Manage custom fields
    Field(FieldCmd),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks whose title contains this text (case-insensitive)
    #[arg(long)]
    pub title: Option<String>,
    /// Only tasks with this priority (repeatable)
    #[arg(long = "priority")]
    pub priorities: Vec<String>,
    /// Only tasks with this status (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,
    /// Custom field filter: field=value (repeatable)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,
    /// Column to sort by
    #[arg(long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page (default from config)
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID
    pub id: u64,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Initial status (default: not_started)
    #[arg(long)]
    pub status: Option<String>,
    /// Priority (default: medium)
    #[arg(long)]
    pub priority: Option<String>,
    /// Custom field value: field=value (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub values: Vec<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Task ID
    pub id: u64,
    #[command(flatten)]
    pub patch: PatchArgs,
}

/// Field changes shared by update and bulk-edit
#[derive(Args)]
pub struct PatchArgs {
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New status
    #[arg(long)]
    pub status: Option<String>,
    /// New priority
    #[arg(long)]
    pub priority: Option<String>,
    /// Custom field value: field=value (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub values: Vec<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Task ID
    pub id: u64,
}

#[derive(Args)]
pub struct BulkEditArgs {
    /// Task IDs
    #[arg(required = true)]
    pub ids: Vec<u64>,
    #[command(flatten)]
    pub patch: PatchArgs,
}

#[derive(Args)]
pub struct BulkDeleteArgs {
    /// Task IDs
    #[arg(required = true)]
    pub ids: Vec<u64>,
}

// ---------------------------------------------------------------------------
// Custom field commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct FieldCmd {
    #[command(subcommand)]
    pub action: FieldAction,
}

#[derive(Subcommand)]
pub enum FieldAction {
    /// Add a custom field to every task
    Add(FieldAddArgs),
    /// Remove a custom field from every task
    Rm(FieldRmArgs),
    /// List columns
    List,
}

#[derive(Args)]
pub struct FieldAddArgs {
    /// Field label, e.g. "Due Date" (stored as due_date)
    pub label: String,
    /// Value type: text, number, boolean
    #[arg(long = "type", default_value = "text")]
    pub field_type: String,
    /// Value given to every task (default: empty text, 0, or false)
    #[arg(long)]
    pub default: Option<String>,
    /// Give one task a different value
    #[arg(long, requires = "value")]
    pub task: Option<u64>,
    /// The value for --task
    #[arg(long, requires = "task")]
    pub value: Option<String>,
}

#[derive(Args)]
pub struct FieldRmArgs {
    /// Field name
    pub name: String,
}
