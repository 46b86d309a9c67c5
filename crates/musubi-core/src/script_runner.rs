//! Invocation of the sync shell scripts.
//!
//! Scripts live in a single configurable directory and are addressed by file
//! name. Every run is reported as a [`ScriptResult`], including spawn
//! failures, non-zero exits and deadline expiry; only a bad script name or a
//! missing scripts directory is returned as an error.
//!
//! # Exit codes
//! - `0`: success
//! - `1`: generic failure, also used when the process gave no code (spawn
//!   failure, killed by signal). The health script uses `1` for "warnings".
//! - `124`: the run exceeded the configured deadline and was killed

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::{Result, SyncError};
use crate::types::ScriptResult;

pub const HEALTH_SCRIPT: &str = "check-sync-health.sh";
pub const SYNC_SCRIPT: &str = "sync-three-way.sh";
pub const DEDUPE_SCRIPT: &str = "cleanup-duplicates.sh";

/// Exit code reported when a run is killed for exceeding its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

const FALLBACK_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone)]
pub struct ScriptRunner {
    scripts_dir: PathBuf,
    env_additions: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl ScriptRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            env_additions: HashMap::new(),
            timeout: None,
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn set_scripts_dir(&mut self, dir: impl Into<PathBuf>) {
        self.scripts_dir = dir.into();
    }

    /// Add an environment variable for every script run.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_env(key, value);
        self
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_additions.insert(key.into(), value.into());
    }

    pub fn remove_env(&mut self, key: &str) {
        self.env_additions.remove(key);
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.env_additions.get(key).map(String::as_str)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Map a script name to its path inside the scripts directory.
    ///
    /// The name must be a single plain path component; the directory must
    /// exist. Whether the file exists is left to the spawn.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(SyncError::InvalidScriptName(name.to_string())),
        }
        if !self.scripts_dir.is_dir() {
            return Err(SyncError::ScriptsDirMissing(self.scripts_dir.clone()));
        }
        Ok(self.scripts_dir.join(name))
    }

    /// Run `name` with `args`, wait for it, and report the outcome as data.
    pub async fn execute(&self, name: &str, args: &[String]) -> Result<ScriptResult> {
        let path = self.resolve(name)?;
        let start = Instant::now();
        tracing::info!(script = name, ?args, "executing script");

        let mut cmd = Command::new(&path);
        cmd.args(args)
            .current_dir(&self.scripts_dir)
            .envs(&self.env_additions)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let outcome = match cmd.spawn() {
            Err(e) => Outcome::Failed {
                stdout: String::new(),
                stderr: format!("failed to spawn '{}': {e}", path.display()),
                exit_code: None,
            },
            Ok(child) => {
                // Dropping the future on timeout drops the child, which kills it.
                let waited = child.wait_with_output();
                let output = match self.timeout {
                    Some(limit) => match tokio::time::timeout(limit, waited).await {
                        Ok(output) => output,
                        Err(_) => {
                            return Ok(self.finish(
                                name,
                                start,
                                Outcome::Failed {
                                    stdout: String::new(),
                                    stderr: format!(
                                        "{name} timed out after {}s",
                                        limit.as_secs_f64()
                                    ),
                                    exit_code: Some(TIMEOUT_EXIT_CODE),
                                },
                            ))
                        }
                    },
                    None => waited.await,
                };
                match output {
                    Ok(out) => {
                        let stdout = String::from_utf8_lossy(&out.stdout).into_owned();
                        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                        if out.status.success() {
                            Outcome::Completed { stdout, stderr }
                        } else {
                            let stderr = if stderr.trim().is_empty() {
                                format!("{name} exited with {}", out.status)
                            } else {
                                stderr
                            };
                            Outcome::Failed {
                                stdout,
                                stderr,
                                exit_code: out.status.code(),
                            }
                        }
                    }
                    Err(e) => Outcome::Failed {
                        stdout: String::new(),
                        stderr: format!("failed to wait for {name}: {e}"),
                        exit_code: None,
                    },
                }
            }
        };

        Ok(self.finish(name, start, outcome))
    }

    fn finish(&self, name: &str, start: Instant, outcome: Outcome) -> ScriptResult {
        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Outcome::Completed { stdout, stderr } => {
                tracing::info!(script = name, exit_code = 0, duration_ms, "script completed");
                tracing::debug!(script = name, %stdout, "script output");
                ScriptResult {
                    stdout,
                    stderr,
                    exit_code: 0,
                    duration_ms,
                }
            }
            Outcome::Failed {
                stdout,
                stderr,
                exit_code,
            } => {
                let exit_code = exit_code.unwrap_or(FALLBACK_EXIT_CODE);
                // The health script exits 1 when it only has warnings. This
                // changes the log level, not the result.
                if name == HEALTH_SCRIPT && exit_code == 1 {
                    tracing::info!(exit_code, duration_ms, "health check completed with warnings");
                } else {
                    tracing::error!(script = name, exit_code, duration_ms, %stderr, "script failed");
                }
                ScriptResult {
                    stdout,
                    stderr,
                    exit_code,
                    duration_ms,
                }
            }
        }
    }

    /// Start `name` in the background and return immediately.
    ///
    /// Output is discarded and the child is placed in its own process group so
    /// it outlives this process. Failures are only logged.
    pub fn execute_detached(&self, name: &str, args: &[String]) {
        let path = match self.resolve(name) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(script = name, "cannot start detached script: {e}");
                return;
            }
        };
        tracing::info!(script = name, ?args, "executing detached script");

        let mut cmd = std::process::Command::new(&path);
        cmd.args(args)
            .current_dir(&self.scripts_dir)
            .envs(&self.env_additions)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        match cmd.spawn() {
            Ok(mut child) => {
                let script = name.to_string();
                // Reap the child without holding up shutdown; detached threads
                // do not keep the process alive.
                std::thread::spawn(move || match child.wait() {
                    Ok(status) => tracing::debug!(%script, %status, "detached script exited"),
                    Err(e) => tracing::warn!(%script, "failed to wait for detached script: {e}"),
                });
            }
            Err(e) => {
                tracing::error!(script = name, "failed to spawn detached script: {e}");
            }
        }
    }
}

enum Outcome {
    Completed {
        stdout: String,
        stderr: String,
    },
    Failed {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },
}
