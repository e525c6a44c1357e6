use std::path::Path;

use crate::io::config_io;
use crate::io::storage::{FileStorage, Storage};
use crate::ops::store::{COLUMNS_KEY, TASKS_KEY, TaskStore};

/// True when both persisted keys are already present
fn has_data(storage: &FileStorage) -> Result<bool, Box<dyn std::error::Error>> {
    Ok(storage.get(TASKS_KEY)?.is_some() && storage.get(COLUMNS_KEY)?.is_some())
}

pub fn cmd_init(data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let storage = FileStorage::open(data_dir)?;
    if has_data(&storage)? {
        return Err(format!("tasktable data already exists in {}/", data_dir.display()).into());
    }

    let wrote_config = config_io::write_default_config(data_dir)?;

    let mut store = TaskStore::new(storage);
    store.initialize()?;

    println!("Initialized tasktable in {}/", data_dir.display());
    println!("  {} seed tasks, {} columns", store.tasks().len(), store.columns().len());
    if wrote_config {
        println!("  config: {}", data_dir.join(config_io::CONFIG_FILE).display());
    }
    Ok(())
}
