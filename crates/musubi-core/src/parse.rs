//! Parsing of the health script's free-form text output.
//!
//! The script prints lines such as `Todoist tasks: 42`, `Things tasks: N/A`
//! and `Things not running`. The patterns below are the whole contract; the
//! orchestrator decides precedence.

use regex::Regex;
use std::sync::OnceLock;

/// What the health script said about the local task manager's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCount {
    /// No `Things tasks:` line at all.
    Missing,
    /// `Things tasks: N/A`.
    Unavailable,
    Count(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub remote_count: Option<u64>,
    pub local: LocalCount,
    pub local_not_running: bool,
}

impl HealthReport {
    /// Online state of the local task manager: a "not running" marker wins
    /// over any parsed count.
    pub fn local_online(&self) -> bool {
        !self.local_not_running && matches!(self.local, LocalCount::Count(_))
    }
}

static REMOTE_COUNT_RE: OnceLock<Regex> = OnceLock::new();
static LOCAL_COUNT_RE: OnceLock<Regex> = OnceLock::new();
static NOT_RUNNING_RE: OnceLock<Regex> = OnceLock::new();

fn remote_count_re() -> &'static Regex {
    REMOTE_COUNT_RE.get_or_init(|| Regex::new(r"(?i)Todoist tasks:\s*(\d+)").unwrap())
}

fn local_count_re() -> &'static Regex {
    LOCAL_COUNT_RE.get_or_init(|| Regex::new(r"(?i)Things tasks:\s*(\d+|N/A)").unwrap())
}

fn not_running_re() -> &'static Regex {
    NOT_RUNNING_RE.get_or_init(|| Regex::new(r"(?i)Things not running").unwrap())
}

pub fn parse_health_output(out: &str) -> HealthReport {
    let remote_count = remote_count_re()
        .captures(out)
        .and_then(|c| c[1].parse::<u64>().ok());

    let local = match local_count_re().captures(out) {
        None => LocalCount::Missing,
        Some(c) if c[1].eq_ignore_ascii_case("N/A") => LocalCount::Unavailable,
        // Digits that overflow u64 are treated like N/A.
        Some(c) => c[1]
            .parse::<u64>()
            .map(LocalCount::Count)
            .unwrap_or(LocalCount::Unavailable),
    };

    HealthReport {
        remote_count,
        local,
        local_not_running: not_running_re().is_match(out),
    }
}
