use crate::context;
use crate::output::{print_json, print_pairs};
use anyhow::Context;
use std::path::Path;

pub fn run(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let result = context::block_on(orch.perform_three_way_sync())?
        .context("three-way sync failed")?;

    if json {
        return print_json(&result);
    }
    print_pairs(&[
        ("Synced", result.synced.to_string()),
        ("Created", result.created.to_string()),
        ("Updated", result.updated.to_string()),
        ("Deleted", result.deleted.to_string()),
    ]);
    for e in &result.errors {
        println!("[error] {e}");
    }
    Ok(())
}
