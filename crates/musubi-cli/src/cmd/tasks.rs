use crate::context;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use std::path::Path;

const MAX_CONTENT: usize = 120;

pub fn run(config: Option<&Path>, count_only: bool, json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let worker = orch.worker_client().context(
        "api.worker_url is not set; run `musubi config set --worker-url <url>` first",
    )?;

    if count_only {
        let count = context::block_on(worker.get_inbox_count())?
            .context("failed to fetch inbox tasks")?;
        if json {
            return print_json(&serde_json::json!({ "count": count }));
        }
        println!("{count}");
        return Ok(());
    }

    let tasks = context::block_on(worker.get_inbox_tasks())?
        .context("failed to fetch inbox tasks")?;
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("Inbox is empty.");
        return Ok(());
    }
    let rows = tasks
        .iter()
        .map(|t| vec![t.id.clone(), truncate(&t.content, MAX_CONTENT)])
        .collect();
    print_table(&["ID", "TASK"], rows);
    Ok(())
}
