use serde::{Deserialize, Serialize};

/// Unique, totally ordered identifier of a fleet unit.
///
/// The ordering is load-bearing: elections pick the minimum id among live
/// agents, and equidistant allocation candidates are broken by lowest id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Sender id reserved for the external control station that injects
    /// tasks. Maximal by construction, so it can never win a minimum-id
    /// election even though its sends refresh liveness like any sender.
    pub const OPERATOR: AgentId = AgentId(u64::MAX);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::OPERATOR {
            write!(f, "operator")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Capability tag an agent advertises and a task requires (e.g. "camera",
/// "lidar"). Assignment candidates must match the task's tag exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability(pub String);

impl Capability {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leadership role claimed in heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    Follower,
    Leader,
    /// Reserved for multi-round elections; never entered in steady state.
    Candidate,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Follower => "follower",
            Self::Leader => "leader",
            Self::Candidate => "candidate",
        };
        write!(f, "{s}")
    }
}
