use anyhow::Context;
use musubi_core::config::ConfigStore;
use musubi_core::paths;
use musubi_core::SyncOrchestrator;
use std::future::Future;
use std::path::Path;

/// Locate and load the config file. A missing file loads as defaults.
pub fn config_store(explicit: Option<&Path>) -> anyhow::Result<ConfigStore> {
    let path = paths::resolve_config_path(explicit).context("cannot locate config file")?;
    let store = ConfigStore::new(path);
    store
        .load()
        .with_context(|| format!("failed to load {}", store.path().display()))?;
    Ok(store)
}

pub fn init(store: ConfigStore) -> anyhow::Result<SyncOrchestrator> {
    let mut orch = SyncOrchestrator::new(store);
    orch.init().context("failed to initialize sync orchestrator")?;
    Ok(orch)
}

pub fn orchestrator(explicit: Option<&Path>) -> anyhow::Result<SyncOrchestrator> {
    init(config_store(explicit)?)
}

/// Drive `fut` to completion on a fresh multi-threaded runtime.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    Ok(rt.block_on(fut))
}
