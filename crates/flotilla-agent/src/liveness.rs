use std::collections::{BTreeSet, HashMap};

use flotilla_protocol::{AgentId, Timestamp};

/// Last-heard bookkeeping per peer.
///
/// An agent records every sender it hears from (its own id included,
/// refreshed each tick so self-liveness never expires) and considers a peer
/// alive while the silence stays within the timeout.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    last_seen: HashMap<AgentId, Timestamp>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `peer` was heard at `timestamp`. Out-of-order receives
    /// never move a peer backwards in time.
    pub fn record_seen(&mut self, peer: AgentId, timestamp: Timestamp) {
        let entry = self.last_seen.entry(peer).or_insert(timestamp);
        if timestamp > *entry {
            *entry = timestamp;
        }
    }

    pub fn last_seen(&self, peer: AgentId) -> Option<Timestamp> {
        self.last_seen.get(&peer).copied()
    }

    /// A peer never heard from is not alive.
    pub fn is_alive(&self, peer: AgentId, now: Timestamp, timeout: f64) -> bool {
        match self.last_seen.get(&peer) {
            Some(&seen) => now - seen <= timeout,
            None => false,
        }
    }

    /// All peers currently within the timeout, in ascending id order.
    pub fn alive_peers(&self, now: Timestamp, timeout: f64) -> BTreeSet<AgentId> {
        self.last_seen
            .iter()
            .filter(|(_, &seen)| now - seen <= timeout)
            .map(|(&id, _)| id)
            .collect()
    }
}
