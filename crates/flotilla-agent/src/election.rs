use std::collections::BTreeSet;

use flotilla_protocol::{AgentId, Role, Timestamp};

use crate::liveness::LivenessTracker;

/// Term-aware bully election state.
///
/// There is no vote exchange: each agent independently elects the minimum
/// id among the peers it currently believes are alive, and transient
/// split-brain resolves deterministically through term+id comparison on the
/// regular heartbeat stream. The term only moves when an agent elects
/// itself or observes a higher term, so it is non-decreasing for the
/// lifetime of the agent.
#[derive(Debug)]
pub struct ElectionState {
    role: Role,
    leader_id: Option<AgentId>,
    term: u64,
}

impl Default for ElectionState {
    fn default() -> Self {
        Self {
            role: Role::Follower,
            leader_id: None,
            term: 0,
        }
    }
}

impl ElectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn leader_id(&self) -> Option<AgentId> {
        self.leader_id
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    /// Leader considered failed when unknown or silent past the timeout.
    pub fn leader_failed(
        &self,
        liveness: &LivenessTracker,
        now: Timestamp,
        timeout: f64,
    ) -> bool {
        match self.leader_id {
            Some(leader) => !liveness.is_alive(leader, now, timeout),
            None => true,
        }
    }

    /// Run the deterministic minimum-id election over `alive` ∪ {self}.
    ///
    /// Idempotent: re-electing an agent that is already Leader changes
    /// nothing, so the term is bumped exactly once per leadership takeover.
    pub fn elect(&mut self, self_id: AgentId, mut alive: BTreeSet<AgentId>) {
        alive.insert(self_id);
        let winner = alive.into_iter().min().unwrap_or(self_id);

        if winner == self_id {
            if self.role != Role::Leader {
                self.term += 1;
                self.role = Role::Leader;
                self.leader_id = Some(self_id);
                tracing::info!(
                    agent = %self_id,
                    term = self.term,
                    "Elected self as leader"
                );
            }
        } else {
            self.role = Role::Follower;
            self.leader_id = Some(winner);
        }
    }

    /// Apply the term and conflict-resolution rules to a received
    /// heartbeat.
    ///
    /// - A higher remote term always demotes self to Follower; if the peer
    ///   claims Leader it is installed as leader outright, otherwise the
    ///   leader is unknown until further heartbeats arrive.
    /// - Two Leaders at the same term: the lower id wins, the higher id
    ///   yields without changing its term.
    /// - A lower remote term is a stale peer; it will self-correct when it
    ///   hears our heartbeat.
    pub fn observe_heartbeat(
        &mut self,
        self_id: AgentId,
        from: AgentId,
        remote_term: u64,
        remote_role: Role,
    ) {
        if remote_term > self.term {
            if self.role == Role::Leader && remote_role == Role::Leader {
                tracing::warn!(
                    agent = %self_id,
                    peer = %from,
                    remote_term,
                    "Leadership conflict: yielding to higher-term leader"
                );
                self.leader_id = Some(from);
            } else if remote_role == Role::Leader {
                self.leader_id = Some(from);
            } else {
                self.leader_id = None;
            }
            self.term = remote_term;
            self.role = Role::Follower;
            return;
        }

        if self.role == Role::Leader
            && remote_role == Role::Leader
            && from != self_id
            && remote_term == self.term
            && from < self_id
        {
            tracing::warn!(
                agent = %self_id,
                peer = %from,
                term = self.term,
                "Leadership conflict: yielding to lower-id leader"
            );
            self.role = Role::Follower;
            self.leader_id = Some(from);
        }
        // Equal term, higher peer id: stay leader, the peer yields when it
        // hears us. Lower remote term: stale peer, no action.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alive(ids: &[u64]) -> BTreeSet<AgentId> {
        ids.iter().map(|&id| AgentId(id)).collect()
    }

    #[test]
    fn test_self_election_bumps_term_once() {
        let mut state = ElectionState::new();
        state.elect(AgentId(1), alive(&[2, 3]));
        assert_eq!(state.role(), Role::Leader);
        assert_eq!(state.leader_id(), Some(AgentId(1)));
        assert_eq!(state.term(), 1);

        // Re-running while already leader is a no-op.
        state.elect(AgentId(1), alive(&[2, 3]));
        assert_eq!(state.term(), 1);
        assert_eq!(state.role(), Role::Leader);
    }

    #[test]
    fn test_follower_adopts_minimum_alive_id() {
        let mut state = ElectionState::new();
        state.elect(AgentId(3), alive(&[2, 5]));
        assert_eq!(state.role(), Role::Follower);
        assert_eq!(state.leader_id(), Some(AgentId(2)));
        assert_eq!(state.term(), 0);
    }

    #[test]
    fn test_election_with_no_peers_elects_self() {
        let mut state = ElectionState::new();
        state.elect(AgentId(4), BTreeSet::new());
        assert_eq!(state.role(), Role::Leader);
        assert_eq!(state.leader_id(), Some(AgentId(4)));
    }

    #[test]
    fn test_leader_failed_when_unknown_or_silent() {
        let state = ElectionState::new();
        let mut liveness = LivenessTracker::new();
        assert!(state.leader_failed(&liveness, 0.0, 2.5));

        let mut state = ElectionState::new();
        state.elect(AgentId(2), alive(&[1]));
        assert_eq!(state.leader_id(), Some(AgentId(1)));
        liveness.record_seen(AgentId(1), 10.0);
        assert!(!state.leader_failed(&liveness, 11.0, 2.5));
        assert!(state.leader_failed(&liveness, 13.0, 2.5));
    }

    #[test]
    fn test_conflict_equal_term_higher_id_yields() {
        // Agent 5 and agent 2 both believe they are leader at term 1.
        let mut five = ElectionState::new();
        five.elect(AgentId(5), BTreeSet::new());
        let mut two = ElectionState::new();
        two.elect(AgentId(2), BTreeSet::new());
        assert_eq!(five.term(), 1);
        assert_eq!(two.term(), 1);

        // Agent 2 hears 5's claim: lower id stays leader.
        two.observe_heartbeat(AgentId(2), AgentId(5), 1, Role::Leader);
        assert_eq!(two.role(), Role::Leader);
        assert_eq!(two.leader_id(), Some(AgentId(2)));

        // Agent 5 hears 2's claim: higher id yields, term unchanged.
        five.observe_heartbeat(AgentId(5), AgentId(2), 1, Role::Leader);
        assert_eq!(five.role(), Role::Follower);
        assert_eq!(five.leader_id(), Some(AgentId(2)));
        assert_eq!(five.term(), 1);
    }

    #[test]
    fn test_conflict_higher_term_wins_regardless_of_id() {
        let mut one = ElectionState::new();
        one.elect(AgentId(1), BTreeSet::new()); // leader, term 1

        one.observe_heartbeat(AgentId(1), AgentId(9), 4, Role::Leader);
        assert_eq!(one.role(), Role::Follower);
        assert_eq!(one.leader_id(), Some(AgentId(9)));
        assert_eq!(one.term(), 4);
    }

    #[test]
    fn test_higher_term_from_follower_demotes_with_leader_unknown() {
        let mut state = ElectionState::new();
        state.elect(AgentId(1), BTreeSet::new()); // leader, term 1

        state.observe_heartbeat(AgentId(1), AgentId(3), 2, Role::Follower);
        assert_eq!(state.role(), Role::Follower);
        assert_eq!(state.leader_id(), None);
        assert_eq!(state.term(), 2);
    }

    #[test]
    fn test_stale_lower_term_leader_is_ignored() {
        let mut state = ElectionState::new();
        state.observe_heartbeat(AgentId(4), AgentId(9), 5, Role::Leader);
        state.elect(AgentId(4), BTreeSet::new());
        // now leader at term 6; a stale term-2 leader claim changes nothing
        let term_before = state.term();
        state.observe_heartbeat(AgentId(4), AgentId(1), 2, Role::Leader);
        assert_eq!(state.role(), Role::Leader);
        assert_eq!(state.term(), term_before);
        assert_eq!(state.leader_id(), Some(AgentId(4)));
    }

    #[test]
    fn test_term_is_monotonic_across_transitions() {
        let mut state = ElectionState::new();
        let mut observed = vec![state.term()];

        state.elect(AgentId(2), BTreeSet::new());
        observed.push(state.term());
        state.observe_heartbeat(AgentId(2), AgentId(1), 3, Role::Leader);
        observed.push(state.term());
        state.observe_heartbeat(AgentId(2), AgentId(7), 1, Role::Leader);
        observed.push(state.term());
        state.elect(AgentId(2), alive(&[5]));
        observed.push(state.term());

        assert!(observed.windows(2).all(|w| w[0] <= w[1]), "{observed:?}");
    }

    #[test]
    fn test_own_heartbeat_is_harmless() {
        let mut state = ElectionState::new();
        state.elect(AgentId(1), BTreeSet::new());
        state.observe_heartbeat(AgentId(1), AgentId(1), 1, Role::Leader);
        assert_eq!(state.role(), Role::Leader);
        assert_eq!(state.term(), 1);
    }
}
