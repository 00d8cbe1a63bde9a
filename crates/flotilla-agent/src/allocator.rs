//! Leader-side task allocation.
//!
//! One pass per tick, leader only. For each uncompleted task:
//! - already assigned: probabilistically re-broadcast the assignment (the
//!   delivery-retry mechanism on a lossy channel; no acks exist)
//! - locked within the stability window: skip, to debounce reassignment
//!   churn from flapping candidate sets
//! - otherwise: assign to the nearest capable agent (lowest id on distance
//!   ties), lock, and broadcast
//!
//! Tasks with no capable candidate stay pending silently and are
//! re-evaluated every tick. A locked, assigned task is never re-opened:
//! assignee failure is not detected here, re-gossip is the only recovery.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::Rng;

use flotilla_env::Environment;
use flotilla_protocol::{AgentId, Capability, Payload, Point, Timestamp};

use crate::config::AgentConfig;
use crate::ledger::TaskLedger;

/// Run one allocation pass over the ledger, mutating assignment state and
/// returning the payloads to broadcast.
pub fn allocation_pass(
    ledger: &mut TaskLedger,
    env: &dyn Environment,
    self_id: AgentId,
    self_capability: &Capability,
    now: Timestamp,
    config: &AgentConfig,
    rng: &mut StdRng,
) -> Vec<Payload> {
    let mut outbound = Vec::new();

    for task in ledger.tasks_mut() {
        if task.completed {
            continue;
        }

        // Assigned: only retry delivery, never reassign.
        if let Some(assignee) = task.assigned_to {
            if rng.gen::<f64>() < config.regossip_probability {
                tracing::debug!(
                    task_id = %task.id,
                    assignee = %assignee,
                    "Re-gossiping existing assignment"
                );
                outbound.push(Payload::TaskAssign {
                    task_id: task.id,
                    task: task.clone(),
                    to: assignee,
                });
            }
            continue;
        }

        // Stability lock: no re-evaluation inside the window.
        if task.locked {
            if let Some(locked_at) = task.lock_time {
                if now - locked_at < config.stability_window {
                    continue;
                }
            }
        }

        let candidates = capable_candidates(env, self_id, self_capability, &task.capability);
        if candidates.is_empty() {
            // Pending until candidates appear; re-checked every tick.
            continue;
        }

        let Some(chosen) = pick_closest(env, &candidates, task.location) else {
            continue;
        };

        task.assigned_to = Some(chosen);
        task.locked = true;
        task.lock_time = Some(now);
        tracing::info!(
            task_id = %task.id,
            assignee = %chosen,
            capability = %task.capability,
            "Assigned task to nearest capable agent"
        );
        outbound.push(Payload::TaskAssign {
            task_id: task.id,
            task: task.clone(),
            to: chosen,
        });
    }

    outbound
}

/// Capability-matching candidates from the oracle, plus self if self
/// matches. Sorted set so distance ties resolve to the lowest id.
fn capable_candidates(
    env: &dyn Environment,
    self_id: AgentId,
    self_capability: &Capability,
    required: &Capability,
) -> BTreeSet<AgentId> {
    let mut candidates: BTreeSet<AgentId> = env
        .neighbors()
        .into_iter()
        .filter(|&peer| env.has_capability(peer, required))
        .collect();
    if self_capability == required {
        candidates.insert(self_id);
    }
    candidates
}

/// Nearest candidate by Euclidean distance; ascending-id scan with a
/// strict-less comparison makes the lowest id win ties. Candidates without
/// an oracle position are skipped.
fn pick_closest(
    env: &dyn Environment,
    candidates: &BTreeSet<AgentId>,
    location: Point,
) -> Option<AgentId> {
    let mut best: Option<(AgentId, f64)> = None;
    for &candidate in candidates {
        let Some(position) = env.position(candidate) else {
            continue;
        };
        let distance = position.distance_to(location);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((candidate, distance)),
        }
    }
    best.map(|(id, _)| id)
}
