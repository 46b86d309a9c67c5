//! HTTP client for the sync worker.
//!
//! One request per call; no retries or caching. Every method except
//! [`WorkerClient::health_check`] fails with [`SyncError::Request`] on a
//! non-success status.

mod types;

pub use types::{
    ComponentHealth, HealthTime, Performance, RemoteCheck, TaskStats, TodoistHealth,
    TypeMetrics, WorkerHealth, WorkerMetrics, WorkerTask,
};

use std::time::Duration;

use crate::error::{Result, SyncError};
use types::TasksEnvelope;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const TASKS_PATH: &str = "/obsidian/tasks";
const HEALTH_PATH: &str = "/health";
const METRICS_PATH: &str = "/metrics";

#[derive(Debug, Clone)]
pub struct WorkerClient {
    base_url: String,
    client: reqwest::Client,
}

impl WorkerClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Build a client whose requests fail once `timeout` elapses.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, endpoint: &str, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "worker request");
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Request {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(resp)
    }

    /// Tasks currently in the worker's inbox. A body that is not the expected
    /// JSON reads as an empty inbox.
    pub async fn get_inbox_tasks(&self) -> Result<Vec<WorkerTask>> {
        let resp = self.get("Worker", TASKS_PATH, &[]).await?;
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<TasksEnvelope>(&body) {
            Ok(envelope) => Ok(envelope.tasks),
            Err(e) => {
                tracing::warn!("unreadable task list from worker, treating as empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Number of inbox tasks. Fetches the full list.
    pub async fn get_inbox_count(&self) -> Result<usize> {
        Ok(self.get_inbox_tasks().await?.len())
    }

    pub async fn get_health(&self) -> Result<WorkerHealth> {
        let resp = self.get("Health", HEALTH_PATH, &[]).await?;
        Ok(resp.json().await?)
    }

    /// Reachability summary that never fails. Component problems the worker
    /// reports are listed even when it answers `ok`.
    pub async fn health_check(&self) -> RemoteCheck {
        match self.get_health().await {
            Ok(h) => RemoteCheck {
                ok: h.ok,
                message: (!h.ok).then(|| "Health reported not ok".to_string()),
                issues: h.issues(),
            },
            Err(e) => RemoteCheck {
                ok: false,
                message: Some(e.to_string()),
                issues: Vec::new(),
            },
        }
    }

    pub async fn get_metrics(&self, hours: u32) -> Result<WorkerMetrics> {
        let resp = self
            .get("Metrics", METRICS_PATH, &[("hours", hours.to_string())])
            .await?;
        Ok(resp.json().await?)
    }
}
