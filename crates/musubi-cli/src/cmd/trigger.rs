use crate::context;
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;

pub fn run(config: Option<&Path>, script: &str, args: &[String], json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    // The detached run only logs its failures; surface a bad name here.
    orch.script_runner()
        .resolve(script)
        .with_context(|| format!("cannot start '{script}'"))?;

    orch.trigger_detached(script, args);

    if json {
        return print_json(&serde_json::json!({
            "script": script,
            "args": args,
            "detached": true,
        }));
    }
    println!("Started {script} in the background");
    Ok(())
}
