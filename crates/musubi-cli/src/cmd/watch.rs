use crate::cmd::status::online_label;
use crate::context;
use chrono::Local;
use musubi_core::types::{time_of_day, SyncStatus};
use musubi_core::SyncOrchestrator;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

pub fn run(config: Option<&Path>, interval_ms: Option<u64>) -> anyhow::Result<()> {
    let orch = context::orchestrator(config)?;
    let cfg = orch.config().get()?;
    let period = Duration::from_millis(interval_ms.unwrap_or(cfg.sync.interval_ms).max(1));
    let auto_sync = cfg.sync.auto_sync;

    tracing::info!(interval_ms = period.as_millis() as u64, auto_sync, "watching");

    context::block_on(watch_until(&orch, period, auto_sync, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }))
}

/// Tick every `period` until `stop` resolves. A tick in progress is dropped
/// when `stop` fires, which kills any script it is waiting on.
async fn watch_until<F: Future<Output = ()>>(
    orch: &SyncOrchestrator,
    period: Duration,
    auto_sync: bool,
    stop: F,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut stop => break,
        }
        tokio::select! {
            _ = tick(orch, auto_sync) => {}
            _ = &mut stop => break,
        }
    }
    tracing::info!("stopping watch");
}

async fn tick(orch: &SyncOrchestrator, auto_sync: bool) {
    if auto_sync {
        if let Err(e) = orch.perform_three_way_sync().await {
            tracing::warn!("scheduled sync failed: {e}");
        }
    }
    let status = orch.get_status().await;
    println!("{}", status_line(&status, &time_of_day(Local::now())));
}

fn status_line(status: &SyncStatus, now: &str) -> String {
    let parts: Vec<String> = status
        .iter()
        .map(|(p, s)| format!("{} {} ({})", p.display_name(), s.count, online_label(s.online)))
        .collect();
    format!("[{now}] {}", parts.join(" | "))
}
