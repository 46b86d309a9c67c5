use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ─── Tasks ────────────────────────────────────────────────────────────────

/// A task in the worker's inbox (`GET /obsidian/tasks`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerTask {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TasksEnvelope {
    #[serde(default)]
    pub tasks: Vec<WorkerTask>,
}

// ─── Health ───────────────────────────────────────────────────────────────

/// Missing keys and explicit `null` both read as the type's default.
fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// The `time` field of a health document: an ISO-8601 string or epoch
/// milliseconds. Anything else is kept but never parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HealthTime {
    Millis(f64),
    Text(String),
    Other(serde_json::Value),
}

/// `GET /health`. Sub-documents the worker leaves out or sends as `null`
/// read as "not ok".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerHealth {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<HealthTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub todoist: TodoistHealth,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kv: ComponentHealth,
    #[serde(default, deserialize_with = "null_as_default")]
    pub d1: ComponentHealth,
}

impl WorkerHealth {
    /// The probe time in local time, if present and well-formed.
    pub fn timestamp(&self) -> Option<DateTime<Local>> {
        let utc = match self.time.as_ref()? {
            HealthTime::Text(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .ok()?
                .with_timezone(&Utc),
            HealthTime::Millis(ms) if ms.is_finite() => {
                DateTime::<Utc>::from_timestamp_millis(*ms as i64)?
            }
            _ => return None,
        };
        Some(utc.with_timezone(&Local))
    }

    /// Human-readable problems reported by the worker, one per failing
    /// component.
    pub fn issues(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut push = |name: &str, ok: bool, error: &Option<String>| {
            if !ok {
                match error {
                    Some(e) => out.push(format!("{name}: {e}")),
                    None => out.push(format!("{name}: not ok")),
                }
            }
        };
        push("todoist", self.todoist.ok, &self.todoist.error);
        push("kv", self.kv.ok, &self.kv.error);
        push("d1", self.d1.ok, &self.d1.error);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoistHealth {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inbox_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`super::WorkerClient::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCheck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failing worker components, e.g. `d1: binding missing`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

// ─── Metrics ──────────────────────────────────────────────────────────────

/// `GET /metrics?hours=N`: aggregate sync statistics over a time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerMetrics {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub total_syncs: u64,
    /// Fraction in `0.0..=1.0`.
    #[serde(default)]
    pub success_rate: f64,
    /// Milliseconds.
    #[serde(default)]
    pub average_duration: f64,
    #[serde(default)]
    pub by_type: BTreeMap<String, TypeMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<Performance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_stats: Option<TaskStats>,
}

impl WorkerMetrics {
    /// Success rate as a whole percentage, clamped to 0..=100.
    pub fn success_percent(&self) -> u32 {
        (self.success_rate * 100.0).round().clamp(0.0, 100.0) as u32
    }

    /// Sync types by count, largest first, at most `limit` entries.
    pub fn top_types(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .by_type
            .iter()
            .map(|(k, v)| (k.as_str(), v.count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(limit);
        entries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMetrics {
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    #[serde(default)]
    pub p50_duration: f64,
    #[serde(default)]
    pub p90_duration: f64,
    #[serde(default)]
    pub p99_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    #[serde(default)]
    pub total_processed: u64,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub updated: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub errors: u64,
}
