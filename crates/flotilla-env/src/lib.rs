//! Flotilla Environment - the external collaborator surface.
//!
//! Agents interact with the world through exactly one seam: the
//! [`Environment`] trait, which bundles the best-effort broadcast channel,
//! the shared monotonic clock, and the spatial/capability oracle. The core
//! agent logic assumes nothing beyond this contract:
//!
//! - `send` is best-effort broadcast; any delivery may be silently dropped
//!   per recipient, and each send delivers to a given inbox at most once
//! - `receive` drains an inbox without blocking; empty is a valid read
//! - `now` is monotonically non-decreasing and shared across agents
//!
//! [`LossyEnv`] is the in-process implementation used by tests and
//! simulation harnesses.

pub mod lossy;

pub use lossy::{LossyEnv, LossyEnvConfig};

use flotilla_protocol::{AgentId, Capability, Envelope, Point, Timestamp};

/// Broadcast channel + clock + spatial/capability oracle.
///
/// Implementations must support concurrent delivery into many independent
/// inboxes; each inbox is owned exclusively by its agent and drained once
/// per tick.
pub trait Environment: Send + Sync {
    /// Best-effort broadcast to all registered agents. May silently drop
    /// the message for any subset of recipients.
    fn send(&self, envelope: Envelope);

    /// Return and clear this agent's pending inbox. Never blocks; an empty
    /// vector is a valid result.
    fn receive(&self, agent: AgentId) -> Vec<Envelope>;

    /// Shared monotonic clock reading.
    fn now(&self) -> Timestamp;

    /// Currently discoverable peers (includes the caller if registered).
    fn neighbors(&self) -> Vec<AgentId>;

    /// Oracle-reported position of an agent, if known.
    fn position(&self, agent: AgentId) -> Option<Point>;

    /// Whether an agent advertises the given capability.
    fn has_capability(&self, agent: AgentId, capability: &Capability) -> bool;
}
