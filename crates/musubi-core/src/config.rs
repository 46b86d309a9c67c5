use crate::error::{Result, SyncError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the sync worker. Empty means "not configured".
    #[serde(default)]
    pub worker_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_auth_token: Option<String>,
    /// Per-request deadline for worker calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            worker_url: String::new(),
            api_token: None,
            repair_auth_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_auto_sync")]
    pub auto_sync: bool,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Deadline for a single script run; `None` waits forever.
    #[serde(default = "default_script_timeout_secs")]
    pub script_timeout_secs: Option<u64>,
}

fn default_auto_sync() -> bool {
    true
}

fn default_interval_ms() -> u64 {
    900_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_script_timeout_secs() -> Option<u64> {
    Some(600)
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: default_auto_sync(),
            interval_ms: default_interval_ms(),
            retry_attempts: default_retry_attempts(),
            script_timeout_secs: default_script_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_scripts")]
    pub scripts: PathBuf,
    #[serde(default = "default_logs")]
    pub logs: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes_vault: Option<PathBuf>,
}

fn fallback_home() -> PathBuf {
    home::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_scripts() -> PathBuf {
    paths::default_scripts_dir(&fallback_home())
}

fn default_logs() -> PathBuf {
    paths::default_logs_dir(&fallback_home())
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts: default_scripts(),
            logs: default_logs(),
            notes_vault: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// A worker URL is the only thing required before the remote client can
    /// be built.
    pub fn is_configured(&self) -> bool {
        !self.api.worker_url.trim().is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Copy of this config with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |t: &Option<String>| t.as_ref().map(|_| "[REDACTED]".to_string());
        let mut out = self.clone();
        out.api.api_token = mask(&self.api.api_token);
        out.api.repair_auth_token = mask(&self.api.repair_auth_token);
        out
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let url = self.api.worker_url.trim();

        if url.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "api.worker_url is not set; remote status and metrics are disabled"
                    .to_string(),
            });
        } else if !(url.starts_with("https://") || url.starts_with("http://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("api.worker_url '{url}' must start with http:// or https://"),
            });
        }

        if !self.paths.scripts.is_dir() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "paths.scripts '{}' does not exist",
                    self.paths.scripts.display()
                ),
            });
        }

        if self.sync.interval_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "sync.interval_ms must be greater than zero".to_string(),
            });
        }

        if self.api.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "api.timeout_secs is 0; every worker request will time out"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// ConfigStore
// ---------------------------------------------------------------------------

/// Shared handle to the on-disk configuration.
///
/// Nothing is read until [`ConfigStore::load`] is called; [`ConfigStore::get`]
/// before that fails with [`SyncError::ConfigurationUnavailable`]. Clones share
/// the same in-memory value, so a `save` through one handle is visible to an
/// orchestrator holding another on its next `init()`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    current: Arc<RwLock<Option<Config>>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// A store that is already loaded with `config`. Nothing touches disk
    /// until `save` is called.
    pub fn with_config(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            current: Arc::new(RwLock::new(Some(config))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file (defaults when it does not exist) and cache it.
    pub fn load(&self) -> Result<Config> {
        let cfg = Config::load(&self.path)?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(cfg.clone());
        Ok(cfg)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.save(&self.path)?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());
        Ok(())
    }

    pub fn get(&self) -> Result<Config> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(SyncError::ConfigurationUnavailable)
    }

    pub fn is_configured(&self) -> bool {
        self.get().map(|c| c.is_configured()).unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
