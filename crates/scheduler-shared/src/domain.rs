//! Domain types shared across the store, runtime, and dispatcher crates
//! (spec.md §3 data model).

use serde::{Deserialize, Serialize};

/// A registered client, identified by the name it sent in its INITIALIZATION
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub enable_overdue: bool,
}

/// Lifecycle of a scheduled task (spec.md §3, §6; `Orphan` and `Overdue`
/// per spec.md §6 error codes and §9 recovery semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Waiting,
    Work,
    Completed,
    Error,
    Cancelled,
    Overdue,
    Orphan,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Waiting => "WAITING",
            TaskStatus::Work => "WORK",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Error => "ERROR",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Overdue => "OVERDUE",
            TaskStatus::Orphan => "ORPHAN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "WAITING" => TaskStatus::Waiting,
            "WORK" => TaskStatus::Work,
            "COMPLETED" => TaskStatus::Completed,
            "ERROR" => TaskStatus::Error,
            "CANCELLED" => TaskStatus::Cancelled,
            "OVERDUE" => TaskStatus::Overdue,
            "ORPHAN" => TaskStatus::Orphan,
            _ => return None,
        })
    }

    /// Statuses a freshly-recovered row is allowed to resume from
    /// (SPEC_FULL.md §4.3.1: a row left in `Work` across a restart is
    /// re-armed as `Waiting`, never silently left `Work`).
    pub fn is_resumable(self) -> bool {
        matches!(self, TaskStatus::Waiting | TaskStatus::Work)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled task row (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub client: String,
    pub handler_id: String,
    pub args: serde_json::Value,
    pub kwargs: serde_json::Value,
    pub time_to_start: chrono::DateTime<chrono::Utc>,
    pub lifetime_secs: i64,
    pub hard: bool,
    pub status: TaskStatusWire,
}

/// `Task.status` travels as its string name on the wire and in storage;
/// this newtype keeps `TaskStatus` (the enum callers match on) distinct
/// from the plain string a `serde_json::Value` row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TaskStatusWire(pub TaskStatus);

impl From<TaskStatusWire> for String {
    fn from(value: TaskStatusWire) -> Self {
        value.0.as_str().to_string()
    }
}

impl TryFrom<String> for TaskStatusWire {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        TaskStatus::parse(&value)
            .map(TaskStatusWire)
            .ok_or_else(|| format!("unknown task status: {value}"))
    }
}
