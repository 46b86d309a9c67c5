use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown when a platform has never been observed.
pub const NOT_AVAILABLE: &str = "n/a";

/// Render a timestamp the way every `lastSync` field shows it.
pub fn time_of_day(t: DateTime<Local>) -> String {
    t.format("%H:%M:%S").to_string()
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// The hosted task-sync worker.
    Remote,
    /// The desktop task manager, observed through the health script.
    Local,
    /// The notes vault; synchronised by hand for now.
    Notes,
}

impl Platform {
    pub fn all() -> &'static [Platform] {
        &[Platform::Remote, Platform::Local, Platform::Notes]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Remote => "remote",
            Platform::Local => "local",
            Platform::Notes => "notes",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Remote => "Todoist",
            Platform::Local => "Things",
            Platform::Notes => "Obsidian",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PlatformStatus / SyncStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    pub count: u64,
    pub online: bool,
    pub last_sync: String,
}

impl Default for PlatformStatus {
    fn default() -> Self {
        Self {
            count: 0,
            online: false,
            last_sync: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Status of all three platforms. Every platform is always present; a
/// platform with no data keeps [`PlatformStatus::default`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub remote: PlatformStatus,
    pub local: PlatformStatus,
    pub notes: PlatformStatus,
}

impl SyncStatus {
    pub fn get(&self, platform: Platform) -> &PlatformStatus {
        match platform {
            Platform::Remote => &self.remote,
            Platform::Local => &self.local,
            Platform::Notes => &self.notes,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Platform, &PlatformStatus)> {
        Platform::all().iter().map(move |p| (*p, self.get(*p)))
    }
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub synced: u64,
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub issues: Vec<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            issues: Vec::new(),
        }
    }

    pub fn unhealthy(issue: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            issues: vec![issue.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCleanupResult {
    pub removed: u64,
    pub errors: Vec<String>,
}

/// Outcome of one script invocation. Produced for every run, including
/// failed spawns and timeouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl ScriptResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_status_is_offline_everywhere() {
        let status = SyncStatus::default();
        for (_, p) in status.iter() {
            assert_eq!(p.count, 0);
            assert!(!p.online);
            assert_eq!(p.last_sync, "n/a");
        }
        assert_eq!(status.iter().count(), 3);
    }

    #[test]
    fn status_serializes_with_fixed_keys() {
        let json = serde_json::to_value(SyncStatus::default()).unwrap();
        for key in ["remote", "local", "notes"] {
            assert_eq!(json[key]["lastSync"], "n/a");
        }
    }

    #[test]
    fn script_result_uses_camel_case() {
        let r = ScriptResult {
            exit_code: 2,
            duration_ms: 15,
            ..Default::default()
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["exitCode"], 2);
        assert_eq!(json["durationMs"], 15);
        assert!(!r.success());
    }

    #[test]
    fn time_of_day_is_hms() {
        let t = Local.with_ymd_and_hms(2024, 3, 1, 7, 5, 9).unwrap();
        assert_eq!(time_of_day(t), "07:05:09");
    }
}
