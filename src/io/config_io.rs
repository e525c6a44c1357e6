use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::storage::atomic_write;
use crate::model::config::AppConfig;

pub const CONFIG_FILE: &str = "config.toml";

const CONFIG_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read config.toml from the data directory. A missing file yields defaults.
pub fn read_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

/// Write the commented default config unless one already exists.
/// Returns true if a file was written.
pub fn write_default_config(data_dir: &Path) -> Result<bool, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(data_dir).map_err(|e| ConfigError::ReadError {
        path: data_dir.to_path_buf(),
        source: e,
    })?;
    atomic_write(&path, CONFIG_TEMPLATE.as_bytes())
        .map_err(|e| ConfigError::ReadError { path, source: e })?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::InsertPosition;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_config(dir.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn template_parses_to_defaults() {
        let dir = TempDir::new().unwrap();
        assert!(write_default_config(dir.path()).unwrap());
        assert!(!write_default_config(dir.path()).unwrap());
        assert_eq!(read_config(dir.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[tasks]\ninsert = \"top\"\n\n[view]\npage_size = 25\n",
        )
        .unwrap();
        let config = read_config(dir.path()).unwrap();
        assert_eq!(config.tasks.insert, InsertPosition::Top);
        assert_eq!(config.view.page_size, 25);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[view\npage_size = ").unwrap();
        assert!(matches!(
            read_config(dir.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
