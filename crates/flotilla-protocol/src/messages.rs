use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::identity::{AgentId, Role};
use crate::types::{Task, TaskId};

/// Message payload, one variant per protocol message kind.
///
/// Dispatch is exhaustive pattern matching; there is no unknown-kind path
/// inside the fleet. Anything that fails to decode at a wire boundary is
/// dropped there (see `Envelope::from_json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Periodic liveness broadcast carrying the sender's claimed role.
    Heartbeat { role: Role },
    /// Introduction of a new task into the fleet (operator or relay).
    TaskAnnounce { task: Task },
    /// Leader-authored assignment, re-gossiped for delivery reliability.
    TaskAssign {
        task_id: TaskId,
        task: Task,
        to: AgentId,
    },
    /// Completion notice; idempotent and monotonic at every receiver.
    TaskDone { task_id: TaskId },
}

impl Payload {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heartbeat { .. } => "heartbeat",
            Self::TaskAnnounce { .. } => "task_announce",
            Self::TaskAssign { .. } => "task_assign",
            Self::TaskDone { .. } => "task_done",
        }
    }
}

/// Broadcast wire unit: a payload wrapped with the headers every receiver
/// needs for liveness tracking and term comparison.
///
/// Constructed exactly once, in the sender's send path, so receivers never
/// trust caller-supplied `from`/`term` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub msg_id: Uuid,
    pub from: AgentId,
    pub term: u64,
    pub payload: Payload,
}

impl Envelope {
    pub fn new(from: AgentId, term: u64, payload: Payload) -> Self {
        Self {
            msg_id: Uuid::new_v4(),
            from,
            term,
            payload,
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(raw: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(raw).map_err(ProtocolError::Decode)
    }
}
