use crate::context;
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;

pub fn run(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let result = context::block_on(orch.clean_duplicates())?
        .context("duplicate cleanup failed")?;

    if json {
        return print_json(&result);
    }
    println!("Removed {} duplicate task(s)", result.removed);
    for e in &result.errors {
        println!("[error] {e}");
    }
    Ok(())
}
