use crate::context;
use crate::output::{print_json, print_pairs, yes_no};
use musubi_core::types::HealthStatus;
use musubi_core::worker::RemoteCheck;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthReport {
    #[serde(flatten)]
    local: HealthStatus,
    /// `None` when no worker is configured.
    remote: Option<RemoteCheck>,
}

pub fn run(config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let report = context::block_on(async {
        let local = orch.check_health().await;
        let remote = match orch.worker_client() {
            Some(worker) => Some(worker.health_check().await),
            None => None,
        };
        HealthReport { local, remote }
    })?;

    if json {
        print_json(&report)?;
    } else {
        let issues = if report.local.issues.is_empty() {
            "none".to_string()
        } else {
            report.local.issues.join("; ")
        };
        let mut pairs = vec![
            ("Healthy", yes_no(report.local.is_healthy)),
            ("Issues", issues),
            ("Worker", worker_summary(report.remote.as_ref())),
        ];
        if let Some(remote) = report.remote.as_ref().filter(|r| !r.issues.is_empty()) {
            pairs.push(("Worker issues", remote.issues.join("; ")));
        }
        print_pairs(&pairs);
    }

    if !report.local.is_healthy {
        anyhow::bail!("health check failed");
    }
    Ok(())
}

fn worker_summary(remote: Option<&RemoteCheck>) -> String {
    match remote {
        None => "not configured".to_string(),
        Some(RemoteCheck { ok: true, .. }) => "reachable".to_string(),
        Some(RemoteCheck { message, .. }) => format!(
            "unreachable ({})",
            message.as_deref().unwrap_or("no details")
        ),
    }
}
