use crate::context;
use crate::output::{print_json, print_pairs, print_table};
use anyhow::Context;
use musubi_core::worker::WorkerMetrics;
use std::path::Path;

/// Number of sync types listed in the breakdown.
const TOP_TYPES: usize = 6;

pub fn run(config: Option<&Path>, hours: u32, json: bool) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let metrics = context::block_on(orch.get_metrics(hours))?
        .with_context(|| format!("failed to fetch metrics for the last {hours}h"))?;

    match metrics {
        None if json => print_json(&serde_json::Value::Null),
        None => {
            println!("remote metrics unavailable: api.worker_url is not set");
            Ok(())
        }
        Some(m) if json => print_json(&m),
        Some(m) => {
            print_summary(&m, hours);
            Ok(())
        }
    }
}

fn ms(v: f64) -> String {
    format!("{v:.0} ms")
}

fn print_summary(m: &WorkerMetrics, hours: u32) {
    let period = m.period.clone().unwrap_or_else(|| format!("{hours}h"));
    let mut pairs = vec![
        ("Period", period),
        ("Total syncs", m.total_syncs.to_string()),
        ("Success rate", format!("{}%", m.success_percent())),
        ("Avg duration", ms(m.average_duration)),
    ];
    if let Some(p) = &m.performance {
        pairs.push(("p50", ms(p.p50_duration)));
        pairs.push(("p90", ms(p.p90_duration)));
        pairs.push(("p99", ms(p.p99_duration)));
    }
    if let Some(t) = &m.task_stats {
        pairs.push(("Processed", t.total_processed.to_string()));
        pairs.push(("Created", t.created.to_string()));
        pairs.push(("Updated", t.updated.to_string()));
        pairs.push(("Completed", t.completed.to_string()));
        pairs.push(("Errors", t.errors.to_string()));
    }
    print_pairs(&pairs);

    let types = m.top_types(TOP_TYPES);
    if !types.is_empty() {
        println!();
        let rows = types
            .into_iter()
            .map(|(name, count)| vec![name.to_string(), count.to_string()])
            .collect();
        print_table(&["TYPE", "SYNCS"], rows);
    }
}
