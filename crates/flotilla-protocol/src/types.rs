use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{AgentId, Capability};

/// Shared logical clock reading, in seconds. All liveness and lock-window
/// comparisons use this, never wall time.
pub type Timestamp = f64;

/// Unique identifier of a work item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Planar coordinate used for nearest-candidate assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A discrete, capability-typed work item.
///
/// Replicated into every agent's ledger by gossip; the assignment fields
/// (`assigned_to`, `locked`, `lock_time`) are authored by the leader and
/// `completed` is monotonic false→true across the fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub location: Point,
    pub capability: Capability,
    #[serde(default)]
    pub assigned_to: Option<AgentId>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub lock_time: Option<Timestamp>,
    #[serde(default)]
    pub completed: bool,
    /// Carried from operator announcements; informational, not enforced.
    #[serde(default)]
    pub deadline: Option<Timestamp>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, location: Point, capability: Capability) -> Self {
        Self {
            id,
            location,
            capability,
            assigned_to: None,
            locked: false,
            lock_time: None,
            completed: false,
            deadline: None,
            created_at: Utc::now(),
        }
    }
}
