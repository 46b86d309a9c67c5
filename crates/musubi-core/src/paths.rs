use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const MUSUBI_DIR: &str = ".musubi";
pub const CONFIG_FILE: &str = "config.yaml";
pub const SCRIPTS_DIR: &str = "scripts";
pub const LOGS_DIR: &str = "logs";

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "MUSUBI_CONFIG";

/// Environment variable exported to every sync script.
pub const WORKER_URL_ENV: &str = "TODOIST_THINGS_WORKER_URL";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(SyncError::HomeNotFound)
}

pub fn musubi_dir(home: &Path) -> PathBuf {
    home.join(MUSUBI_DIR)
}

pub fn config_path(home: &Path) -> PathBuf {
    musubi_dir(home).join(CONFIG_FILE)
}

pub fn default_scripts_dir(home: &Path) -> PathBuf {
    musubi_dir(home).join(SCRIPTS_DIR)
}

pub fn default_logs_dir(home: &Path) -> PathBuf {
    musubi_dir(home).join(LOGS_DIR)
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `explicit` (the `--config` flag / `MUSUBI_CONFIG` env var)
/// 2. `~/.musubi/config.yaml`
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    Ok(config_path(&home_dir()?))
}
