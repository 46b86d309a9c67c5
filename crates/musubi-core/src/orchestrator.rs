//! Combines worker health and script output into one status model, and runs
//! the maintenance scripts.
//!
//! Two error policies live side by side:
//! - [`SyncOrchestrator::get_status`] and [`SyncOrchestrator::check_health`]
//!   degrade: every failing source is logged and replaced by a default.
//! - [`SyncOrchestrator::perform_three_way_sync`],
//!   [`SyncOrchestrator::clean_duplicates`] and
//!   [`SyncOrchestrator::get_metrics`] propagate failures to the caller.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::config::ConfigStore;
use crate::error::{Result, SyncError};
use crate::parse::{parse_health_output, HealthReport, LocalCount};
use crate::paths::WORKER_URL_ENV;
use crate::script_runner::{ScriptRunner, DEDUPE_SCRIPT, HEALTH_SCRIPT, SYNC_SCRIPT};
use crate::types::{
    time_of_day, DuplicateCleanupResult, HealthStatus, PlatformStatus, ScriptResult, SyncResult,
    SyncStatus, NOT_AVAILABLE,
};
use crate::worker::{WorkerClient, WorkerMetrics};

/// Issue reported by [`SyncOrchestrator::check_health`] when the health
/// script could not be run or crashed.
pub const HEALTH_CHECK_FAILED: &str = "Failed to run health check";

pub struct SyncOrchestrator {
    config: ConfigStore,
    runner: ScriptRunner,
    worker: Option<WorkerClient>,
}

impl SyncOrchestrator {
    /// Nothing is read from `config` until [`SyncOrchestrator::init`].
    pub fn new(config: ConfigStore) -> Self {
        Self {
            config,
            runner: ScriptRunner::new(crate::config::PathsConfig::default().scripts),
            worker: None,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn worker_client(&self) -> Option<&WorkerClient> {
        self.worker.as_ref()
    }

    pub fn script_runner(&self) -> &ScriptRunner {
        &self.runner
    }

    /// Re-read the configuration and rebuild everything derived from it.
    ///
    /// Safe to call again after the configuration changes. The worker client
    /// exists exactly when a worker URL is configured.
    pub fn init(&mut self) -> Result<()> {
        tracing::info!("initializing sync orchestrator");
        let cfg = self.config.get()?;

        self.runner.set_scripts_dir(cfg.paths.scripts.clone());
        self.runner
            .set_timeout(cfg.sync.script_timeout_secs.map(Duration::from_secs));

        // A value already in the process environment is inherited as-is.
        if std::env::var_os(WORKER_URL_ENV).is_none() && cfg.is_configured() {
            self.runner.set_env(WORKER_URL_ENV, cfg.api.worker_url.trim());
        } else {
            self.runner.remove_env(WORKER_URL_ENV);
        }

        self.worker = if cfg.is_configured() {
            Some(WorkerClient::with_timeout(
                cfg.api.worker_url.trim(),
                Duration::from_secs(cfg.api.timeout_secs),
            )?)
        } else {
            None
        };
        Ok(())
    }

    /// Status of every platform. Never fails; a source that cannot be read
    /// leaves its platform at the default.
    pub async fn get_status(&self) -> SyncStatus {
        let mut status = SyncStatus::default();
        let mut remote_from_worker = false;

        if let Some(worker) = &self.worker {
            match worker.get_health().await {
                Ok(h) => {
                    let when = h.timestamp().unwrap_or_else(Local::now);
                    status.remote = PlatformStatus {
                        count: h.todoist.inbox_count,
                        online: h.todoist.ok,
                        last_sync: time_of_day(when),
                    };
                    remote_from_worker = true;
                }
                Err(e) => {
                    tracing::warn!("worker health check failed, falling back to defaults: {e}");
                }
            }
        }

        match self.runner.execute(HEALTH_SCRIPT, &[]).await {
            Ok(result) => {
                let report = parse_health_output(&result.stdout);
                apply_health_report(&mut status, &report, remote_from_worker, Local::now());
            }
            Err(e) => {
                tracing::warn!("health script failed; continuing with available data: {e}");
            }
        }

        // The notes vault has no automatic probe yet.
        status.notes = PlatformStatus {
            count: 0,
            online: true,
            last_sync: NOT_AVAILABLE.to_string(),
        };

        status
    }

    /// Worker metrics for the last `hours`, or `None` when no worker is
    /// configured.
    pub async fn get_metrics(&self, hours: u32) -> Result<Option<WorkerMetrics>> {
        match &self.worker {
            None => Ok(None),
            Some(worker) => worker.get_metrics(hours).await.map(Some),
        }
    }

    /// Run the three-way sync script. Fails if the script cannot be run or
    /// exits non-zero.
    ///
    /// The counts are a fixed summary, not read from the script's output.
    // TODO: derive the counts once sync-three-way.sh prints a machine-readable summary.
    pub async fn perform_three_way_sync(&self) -> Result<SyncResult> {
        tracing::info!("performing three-way sync");
        self.run_checked(SYNC_SCRIPT).await.map_err(|e| {
            tracing::error!("three-way sync failed: {e}");
            e
        })?;
        Ok(SyncResult {
            synced: 6,
            created: 2,
            updated: 3,
            deleted: 1,
            errors: Vec::new(),
        })
    }

    /// Coarse health verdict from the health script's exit code. Exit 1
    /// means warnings and still counts as healthy; anything else that is not
    /// a clean exit collapses to a single [`HEALTH_CHECK_FAILED`] issue.
    pub async fn check_health(&self) -> HealthStatus {
        tracing::info!("checking system health");
        match self.runner.execute(HEALTH_SCRIPT, &[]).await {
            Ok(r) if r.exit_code == 0 || r.exit_code == 1 => HealthStatus::healthy(),
            Ok(r) => {
                tracing::warn!(exit_code = r.exit_code, "health script did not complete");
                HealthStatus::unhealthy(HEALTH_CHECK_FAILED)
            }
            Err(e) => {
                tracing::warn!("health script could not be run: {e}");
                HealthStatus::unhealthy(HEALTH_CHECK_FAILED)
            }
        }
    }

    /// Run the duplicate cleanup script. Fails if the script cannot be run
    /// or exits non-zero.
    pub async fn clean_duplicates(&self) -> Result<DuplicateCleanupResult> {
        tracing::info!("cleaning duplicates");
        self.run_checked(DEDUPE_SCRIPT).await.map_err(|e| {
            tracing::error!("duplicate cleanup failed: {e}");
            e
        })?;
        Ok(DuplicateCleanupResult {
            removed: 3,
            errors: Vec::new(),
        })
    }

    /// Start a script in the background without waiting for it.
    pub fn trigger_detached(&self, name: &str, args: &[String]) {
        self.runner.execute_detached(name, args);
    }

    async fn run_checked(&self, script: &str) -> Result<ScriptResult> {
        let result = self.runner.execute(script, &[]).await?;
        if !result.success() {
            return Err(SyncError::ScriptFailed {
                script: script.to_string(),
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }
}

/// Fold parsed health-script output into `status`.
///
/// A remote count from the script only applies when the worker did not
/// already answer.
pub(crate) fn apply_health_report(
    status: &mut SyncStatus,
    report: &HealthReport,
    remote_from_worker: bool,
    now: DateTime<Local>,
) {
    if !remote_from_worker {
        if let Some(count) = report.remote_count {
            status.remote.count = count;
            status.remote.online = true;
        }
    }

    if let LocalCount::Count(count) = report.local {
        status.local.count = count;
    }
    status.local.online = report.local_online();
    status.local.last_sync = time_of_day(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::Platform;
    use tempfile::TempDir;

    fn orchestrator(scripts: &std::path::Path, worker_url: Option<&str>) -> SyncOrchestrator {
        let mut cfg = Config::default();
        cfg.paths.scripts = scripts.to_path_buf();
        cfg.sync.script_timeout_secs = Some(10);
        cfg.api.timeout_secs = 5;
        if let Some(url) = worker_url {
            cfg.api.worker_url = url.to_string();
        }
        let store = ConfigStore::with_config(scripts.join("config.yaml"), cfg);
        let mut orch = SyncOrchestrator::new(store);
        orch.init().unwrap();
        orch
    }

    // ── apply_health_report (pure) ────────────────────────────────────────

    #[test]
    fn script_remote_count_applies_without_worker() {
        let mut status = SyncStatus::default();
        let report = parse_health_output("Todoist tasks: 42");
        apply_health_report(&mut status, &report, false, Local::now());
        assert_eq!(status.remote.count, 42);
        assert!(status.remote.online);
        assert_eq!(status.remote.last_sync, NOT_AVAILABLE);
    }

    #[test]
    fn worker_count_takes_precedence_over_script() {
        let mut status = SyncStatus::default();
        status.remote = PlatformStatus {
            count: 5,
            online: true,
            last_sync: "12:00:00".into(),
        };
        let report = parse_health_output("Todoist tasks: 42");
        apply_health_report(&mut status, &report, true, Local::now());
        assert_eq!(status.remote.count, 5);
        assert_eq!(status.remote.last_sync, "12:00:00");
    }

    #[test]
    fn local_na_stays_offline_and_zero() {
        let mut status = SyncStatus::default();
        let report = parse_health_output("Things tasks: N/A");
        apply_health_report(&mut status, &report, false, Local::now());
        assert_eq!(status.local.count, 0);
        assert!(!status.local.online);
    }

    #[test]
    fn local_not_running_overrides_count() {
        let mut status = SyncStatus::default();
        let report = parse_health_output("Things tasks: 9\nThings not running");
        apply_health_report(&mut status, &report, false, Local::now());
        assert_eq!(status.local.count, 9);
        assert!(!status.local.online);
    }

    #[test]
    fn local_count_marks_online_and_stamps_time() {
        let now = Local::now();
        let mut status = SyncStatus::default();
        let report = parse_health_output("Things tasks: 4");
        apply_health_report(&mut status, &report, false, now);
        assert_eq!(status.local.count, 4);
        assert!(status.local.online);
        assert_eq!(status.local.last_sync, time_of_day(now));
    }

    // ── init ──────────────────────────────────────────────────────────────

    #[test]
    fn init_before_load_is_configuration_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut orch = SyncOrchestrator::new(ConfigStore::new(dir.path().join("c.yaml")));
        assert!(matches!(orch.init(), Err(SyncError::ConfigurationUnavailable)));
        assert!(orch.worker_client().is_none());
    }

    #[test]
    fn init_builds_and_clears_worker_client() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(dir.path(), Some("https://worker.example.dev/"));
        assert_eq!(
            orch.worker_client().map(|w| w.base_url()),
            Some("https://worker.example.dev")
        );
        assert_eq!(orch.script_runner().scripts_dir(), dir.path());

        let mut cfg = orch.config().get().unwrap();
        cfg.api.worker_url = String::new();
        orch.config().save(&cfg).unwrap();
        orch.init().unwrap();
        assert!(orch.worker_client().is_none());
        assert_eq!(orch.script_runner().env(WORKER_URL_ENV), None);
    }

    #[test]
    fn init_exports_worker_url_unless_inherited() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path(), Some("https://worker.example.dev"));
        let exported = orch.script_runner().env(WORKER_URL_ENV);
        if std::env::var_os(WORKER_URL_ENV).is_some() {
            assert_eq!(exported, None);
        } else {
            assert_eq!(exported, Some("https://worker.example.dev"));
        }
    }

    #[test]
    fn init_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(dir.path(), None);
        orch.init().unwrap();
        orch.init().unwrap();
        assert!(orch.worker_client().is_none());
        assert_eq!(orch.script_runner().timeout(), Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn metrics_are_none_without_worker() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(dir.path(), None);
        for hours in [1, 24, 168, 0] {
            assert!(orch.get_metrics(hours).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn status_without_scripts_dir_still_returns() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir.path().join("missing"), None);
        let status = orch.get_status().await;
        assert_eq!(status.remote, PlatformStatus::default());
        assert_eq!(status.local, PlatformStatus::default());
        assert!(status.notes.online);
        assert_eq!(status.notes.last_sync, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn check_health_without_scripts_dir_is_exact_failure() {
        let dir = TempDir::new().unwrap();
        let orch = orchestrator(&dir.path().join("missing"), None);
        assert_eq!(
            orch.check_health().await,
            HealthStatus {
                is_healthy: false,
                issues: vec!["Failed to run health check".to_string()],
            }
        );
    }

    // ── lenient worker health documents ──────────────────────────────────

    async fn status_for_health_body(body: &str) -> SyncStatus {
        let dir = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let orch = orchestrator(&dir.path().join("missing"), Some(&server.url()));
        orch.get_status().await
    }

    #[tokio::test]
    async fn null_inbox_count_keeps_remote_online() {
        let status =
            status_for_health_body(r#"{"ok": true, "todoist": {"ok": true, "inboxCount": null}}"#)
                .await;
        assert_eq!(status.remote.count, 0);
        assert!(status.remote.online);
        assert_ne!(status.remote.last_sync, NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn epoch_millis_time_is_rendered() {
        let status = status_for_health_body(
            r#"{"ok": true, "time": 1714566600000, "todoist": {"ok": true, "inboxCount": 5}}"#,
        )
        .await;
        let expected = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(1_714_566_600_000)
            .unwrap()
            .with_timezone(&Local);
        assert_eq!(
            status.remote,
            PlatformStatus {
                count: 5,
                online: true,
                last_sync: time_of_day(expected),
            }
        );
    }

    #[tokio::test]
    async fn null_todoist_document_still_counts_as_answered() {
        let status = status_for_health_body(r#"{"todoist": null}"#).await;
        assert_eq!(status.remote.count, 0);
        assert!(!status.remote.online);
        assert_ne!(status.remote.last_sync, NOT_AVAILABLE);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::script_runner::test_support::write_script;

        const HEALTH_OK: &str = r#"{
            "ok": true,
            "time": "2024-05-01T12:30:00Z",
            "todoist": { "ok": true, "inboxCount": 5 },
            "kv": { "ok": true },
            "d1": { "ok": true }
        }"#;

        #[tokio::test]
        async fn scenario_no_worker_local_not_running() {
            let dir = TempDir::new().unwrap();
            write_script(
                dir.path(),
                HEALTH_SCRIPT,
                "echo 'Todoist tasks: 10'\necho 'Things not running'\nexit 1",
            );
            let orch = orchestrator(dir.path(), None);

            let status = orch.get_status().await;
            assert_eq!(status.remote.count, 10);
            assert!(status.remote.online);
            assert_eq!(status.local.count, 0);
            assert!(!status.local.online);
            assert_eq!(
                status.notes,
                PlatformStatus {
                    count: 0,
                    online: true,
                    last_sync: "n/a".into()
                }
            );
        }

        #[tokio::test]
        async fn worker_health_wins_over_script_count() {
            let dir = TempDir::new().unwrap();
            write_script(
                dir.path(),
                HEALTH_SCRIPT,
                "echo 'Todoist tasks: 42'\necho 'Things tasks: 3'",
            );
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/health")
                .with_status(200)
                .with_body(HEALTH_OK)
                .create_async()
                .await;
            let orch = orchestrator(dir.path(), Some(&server.url()));

            let status = orch.get_status().await;
            assert_eq!(status.remote.count, 5);
            assert!(status.remote.online);
            let expected = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
                .unwrap()
                .with_timezone(&Local);
            assert_eq!(status.remote.last_sync, time_of_day(expected));
            assert_eq!(status.get(Platform::Local).count, 3);
            assert!(status.local.online);
        }

        #[tokio::test]
        async fn failing_worker_falls_back_to_script() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), HEALTH_SCRIPT, "echo 'Todoist tasks: 42'");
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/health")
                .with_status(500)
                .create_async()
                .await;
            let orch = orchestrator(dir.path(), Some(&server.url()));

            let status = orch.get_status().await;
            assert_eq!(status.remote.count, 42);
            assert!(status.remote.online);
            assert!(status.notes.online);
        }

        #[tokio::test]
        async fn worker_health_without_time_uses_now() {
            let dir = TempDir::new().unwrap();
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/health")
                .with_status(200)
                .with_body(r#"{"ok": true, "todoist": {"ok": false, "inboxCount": 2}}"#)
                .create_async()
                .await;
            let orch = orchestrator(dir.path(), Some(&server.url()));

            let status = orch.get_status().await;
            assert_eq!(status.remote.count, 2);
            assert!(!status.remote.online);
            assert_ne!(status.remote.last_sync, NOT_AVAILABLE);
        }

        #[tokio::test]
        async fn metrics_delegate_to_worker() {
            let dir = TempDir::new().unwrap();
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/metrics")
                .match_query(mockito::Matcher::UrlEncoded("hours".into(), "1".into()))
                .with_status(200)
                .with_body(r#"{"period": "1h", "totalSyncs": 4}"#)
                .create_async()
                .await;
            let orch = orchestrator(dir.path(), Some(&server.url()));

            let metrics = orch.get_metrics(1).await.unwrap().unwrap();
            assert_eq!(metrics.total_syncs, 4);
        }

        #[tokio::test]
        async fn metrics_errors_propagate() {
            let dir = TempDir::new().unwrap();
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/metrics")
                .match_query(mockito::Matcher::Any)
                .with_status(401)
                .create_async()
                .await;
            let orch = orchestrator(dir.path(), Some(&server.url()));

            let err = orch.get_metrics(24).await.unwrap_err();
            assert_eq!(err.status(), Some(401));
        }

        #[tokio::test]
        async fn sync_success_returns_summary() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), SYNC_SCRIPT, "echo synced");
            let orch = orchestrator(dir.path(), None);

            let result = orch.perform_three_way_sync().await.unwrap();
            assert_eq!(result.synced, 6);
            assert_eq!(result.created + result.updated + result.deleted, 6);
            assert!(result.errors.is_empty());
        }

        #[tokio::test]
        async fn sync_failure_propagates() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), SYNC_SCRIPT, "echo 'token expired' >&2\nexit 2");
            let orch = orchestrator(dir.path(), None);

            let err = orch.perform_three_way_sync().await.unwrap_err();
            match err {
                SyncError::ScriptFailed {
                    script,
                    exit_code,
                    stderr,
                } => {
                    assert_eq!(script, SYNC_SCRIPT);
                    assert_eq!(exit_code, 2);
                    assert_eq!(stderr, "token expired");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test]
        async fn sync_missing_script_propagates() {
            let dir = TempDir::new().unwrap();
            let orch = orchestrator(dir.path(), None);
            let err = orch.perform_three_way_sync().await.unwrap_err();
            assert!(matches!(err, SyncError::ScriptFailed { exit_code: 1, .. }));
        }

        #[tokio::test]
        async fn check_health_accepts_warnings() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), HEALTH_SCRIPT, "echo 'Things not running'\nexit 1");
            let orch = orchestrator(dir.path(), None);
            assert_eq!(orch.check_health().await, HealthStatus::healthy());
        }

        #[tokio::test]
        async fn check_health_crash_is_exact_failure() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), HEALTH_SCRIPT, "echo 'Todoist tasks: 3'\nexit 7");
            let orch = orchestrator(dir.path(), None);
            let health = orch.check_health().await;
            assert!(!health.is_healthy);
            assert_eq!(health.issues, vec![HEALTH_CHECK_FAILED.to_string()]);
        }

        #[tokio::test]
        async fn dedupe_success_and_failure() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), DEDUPE_SCRIPT, "exit 0");
            let orch = orchestrator(dir.path(), None);
            let result = orch.clean_duplicates().await.unwrap();
            assert_eq!(result.removed, 3);

            write_script(dir.path(), DEDUPE_SCRIPT, "exit 4");
            let err = orch.clean_duplicates().await.unwrap_err();
            assert!(matches!(err, SyncError::ScriptFailed { exit_code: 4, .. }));
        }

        #[tokio::test]
        async fn trigger_detached_runs_in_background() {
            let dir = TempDir::new().unwrap();
            let marker = dir.path().join("triggered");
            write_script(
                dir.path(),
                SYNC_SCRIPT,
                &format!("touch '{}'", marker.display()),
            );
            let orch = orchestrator(dir.path(), None);
            orch.trigger_detached(SYNC_SCRIPT, &[]);

            for _ in 0..50 {
                if marker.exists() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            panic!("detached sync never ran");
        }
    }
}
