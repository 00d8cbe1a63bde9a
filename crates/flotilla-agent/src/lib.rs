//! Flotilla Agent - the per-agent decision core.
//!
//! Each agent runs the same single-threaded control loop over a lossy
//! broadcast channel:
//!
//! 1. Drain the inbox and dispatch by message kind
//! 2. Emit a throttled heartbeat
//! 3. Check leader liveness; run the minimum-id election if it failed
//! 4. (Leader only) allocate unassigned tasks to the nearest capable agent
//! 5. (If assigned) execute and report the current task
//!
//! Leadership is inferred, never voted: every agent independently picks the
//! lowest live id, and transient split-brain heals through term+id
//! comparison on the existing heartbeat stream. Nothing in this loop blocks
//! and no protocol condition is fatal.

pub mod agent;
pub mod allocator;
pub mod config;
pub mod election;
pub mod ledger;
pub mod liveness;

pub use agent::Agent;
pub use config::{AgentConfig, ConfigError};
pub use election::ElectionState;
pub use ledger::TaskLedger;
pub use liveness::LivenessTracker;
