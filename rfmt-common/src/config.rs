//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "RFMT_ROOT_FOLDER";

/// Rows per bulk insert when nothing else is configured
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Address the HTTP server binds to when nothing else is configured
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "rfmt.db";

/// Contents of `config.toml`
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    #[serde(default)]
    pub import: ImportSettings,
}

/// `[import]` table of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportSettings {
    /// Records per bulk insert
    pub batch_size: Option<usize>,
    /// Where uploaded CSV files are staged before import
    pub upload_dir: Option<PathBuf>,
}

impl TomlConfig {
    /// Batch size after applying the default, rejecting zero
    pub fn batch_size(&self) -> Result<usize> {
        validate_batch_size(self.import.batch_size.unwrap_or(DEFAULT_BATCH_SIZE))
    }

    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    /// Upload directory, defaulting to `<root>/uploads`
    pub fn upload_dir(&self, root_folder: &Path) -> PathBuf {
        self.import
            .upload_dir
            .clone()
            .unwrap_or_else(|| root_folder.join("uploads"))
    }
}

/// Reject a zero batch size, which would never flush
pub fn validate_batch_size(batch_size: usize) -> Result<usize> {
    if batch_size == 0 {
        return Err(Error::Config("import batch size must be at least 1".to_string()));
    }
    Ok(batch_size)
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: Option<&TomlConfig>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root_folder) = toml_config.and_then(|c| c.root_folder.clone()) {
        return root_folder;
    }

    get_default_root_folder()
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load `config.toml` from an explicit path or the platform config directory
///
/// A missing file yields the defaults; a file that exists but does not parse
/// is an error.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return read_toml_config(path);
    }

    match default_config_file() {
        Some(path) if path.exists() => {
            tracing::info!("Loading configuration from {}", path.display());
            read_toml_config(&path)
        }
        _ => Ok(TomlConfig::default()),
    }
}

/// Write a TOML config file, creating the parent directory if needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Platform config file location: `<config dir>/rfmt/config.toml`
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rfmt").join("config.toml"))
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/rfmt (or /var/lib/rfmt for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("rfmt"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/rfmt"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("rfmt"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/rfmt"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("rfmt"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\rfmt"))
    } else {
        PathBuf::from("./rfmt_data")
    }
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}
