use crate::context;
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use musubi_core::config::{Config, WarnLevel};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the current configuration with tokens redacted
    Show,

    /// Print the config file location
    Path,

    /// Validate the config for common mistakes
    Validate,

    /// Update settings and re-initialize
    Set {
        /// Base URL of the sync worker (empty string to unset)
        #[arg(long)]
        worker_url: Option<String>,
        /// API token sent to the worker
        #[arg(long)]
        api_token: Option<String>,
        /// Token for the worker's repair endpoints
        #[arg(long)]
        repair_auth_token: Option<String>,
        /// Directory holding the sync scripts
        #[arg(long)]
        scripts_dir: Option<PathBuf>,
        /// Sync automatically on every `watch` tick
        #[arg(long)]
        auto_sync: Option<bool>,
        /// Milliseconds between `watch` ticks
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Per-request deadline for worker calls, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config, json),
        ConfigSubcommand::Path => path(config, json),
        ConfigSubcommand::Validate => validate(config, json),
        ConfigSubcommand::Set {
            worker_url,
            api_token,
            repair_auth_token,
            scripts_dir,
            auto_sync,
            interval_ms,
            timeout_secs,
        } => set(
            config,
            Settings {
                worker_url,
                api_token,
                repair_auth_token,
                scripts_dir,
                auto_sync,
                interval_ms,
                timeout_secs,
            },
            json,
        ),
    }
}

// ---------------------------------------------------------------------------
// show / path
// ---------------------------------------------------------------------------

fn show(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let store = context::config_store(config)?;
    let cfg = store.get()?.redacted();
    if json {
        return print_json(&cfg);
    }
    print!("{}", serde_yaml::to_string(&cfg)?);
    Ok(())
}

fn path(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let path = musubi_core::paths::resolve_config_path(config)?;
    if json {
        return print_json(&serde_json::json!({ "path": path }));
    }
    println!("{}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let store = context::config_store(config)?;
    let warnings = store.get()?.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// set
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Settings {
    worker_url: Option<String>,
    api_token: Option<String>,
    repair_auth_token: Option<String>,
    scripts_dir: Option<PathBuf>,
    auto_sync: Option<bool>,
    interval_ms: Option<u64>,
    timeout_secs: Option<u64>,
}

impl Settings {
    /// Apply every provided field. An empty token clears it.
    fn apply(self, cfg: &mut Config) {
        let token = |t: String| (!t.trim().is_empty()).then_some(t);
        if let Some(url) = self.worker_url {
            cfg.api.worker_url = url.trim().to_string();
        }
        if let Some(t) = self.api_token {
            cfg.api.api_token = token(t);
        }
        if let Some(t) = self.repair_auth_token {
            cfg.api.repair_auth_token = token(t);
        }
        if let Some(dir) = self.scripts_dir {
            cfg.paths.scripts = dir;
        }
        if let Some(v) = self.auto_sync {
            cfg.sync.auto_sync = v;
        }
        if let Some(v) = self.interval_ms {
            cfg.sync.interval_ms = v;
        }
        if let Some(v) = self.timeout_secs {
            cfg.api.timeout_secs = v;
        }
    }
}

fn set(config: Option<&Path>, settings: Settings, json: bool) -> anyhow::Result<()> {
    let store = context::config_store(config)?;
    let mut cfg = store.get()?;
    settings.apply(&mut cfg);
    store
        .save(&cfg)
        .with_context(|| format!("failed to write {}", store.path().display()))?;

    let path = store.path().to_path_buf();
    let orch = context::init(store)?;

    if json {
        return print_json(&cfg.redacted());
    }
    println!("Saved {}", path.display());
    if orch.worker_client().is_none() {
        println!("Worker URL not set; remote status and metrics are disabled.");
    }
    Ok(())
}
