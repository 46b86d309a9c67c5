use crate::context;
use crate::output::{print_json, print_table};
use musubi_core::types::SyncStatus;
use std::path::Path;

pub fn run(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let status = context::block_on(orch.get_status())?;

    if json {
        return print_json(&status);
    }
    print_table(&["PLATFORM", "TASKS", "STATE", "LAST SYNC"], rows(&status));
    Ok(())
}

pub(crate) fn online_label(online: bool) -> &'static str {
    if online {
        "online"
    } else {
        "offline"
    }
}

fn rows(status: &SyncStatus) -> Vec<Vec<String>> {
    status
        .iter()
        .map(|(platform, s)| {
            vec![
                platform.display_name().to_string(),
                s.count.to_string(),
                online_label(s.online).to_string(),
                s.last_sync.clone(),
            ]
        })
        .collect()
}
