//! In-process lossy broadcast environment.
//!
//! Models the fleet's radio: every send is broadcast to all registered
//! inboxes, each recipient independently rolls against the drop
//! probability, and delivery order across inboxes is whatever the send
//! order happened to be. The clock is advanced manually by the harness.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flotilla_protocol::{AgentId, Capability, Envelope, Point, Timestamp};

use crate::Environment;

/// Configuration for the lossy broadcast simulation.
#[derive(Debug, Clone)]
pub struct LossyEnvConfig {
    /// Probability that any single recipient misses a broadcast.
    pub drop_probability: f64,
    /// Seed for reproducible loss patterns (None = entropy).
    pub seed: Option<u64>,
}

impl Default for LossyEnvConfig {
    fn default() -> Self {
        Self {
            drop_probability: 0.3,
            seed: None,
        }
    }
}

struct Inner {
    time: Timestamp,
    drop_probability: f64,
    inboxes: HashMap<AgentId, Vec<Envelope>>,
    positions: HashMap<AgentId, Point>,
    capabilities: HashMap<AgentId, Capability>,
    rng: StdRng,
}

/// Lossy broadcast channel + manual clock + spatial/capability oracle.
///
/// All state sits behind one mutex; agents call in through `&self`, so a
/// single instance can be shared as `Arc<LossyEnv>` across every agent in
/// a simulation.
pub struct LossyEnv {
    inner: Mutex<Inner>,
}

impl LossyEnv {
    pub fn new(config: LossyEnvConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            inner: Mutex::new(Inner {
                time: 0.0,
                drop_probability: config.drop_probability,
                inboxes: HashMap::new(),
                positions: HashMap::new(),
                capabilities: HashMap::new(),
                rng,
            }),
        }
    }

    /// Register an agent's inbox along with its oracle-visible position and
    /// capability.
    pub fn register(&self, agent: AgentId, position: Point, capability: Capability) {
        let mut inner = self.lock();
        inner.inboxes.insert(agent, Vec::new());
        inner.positions.insert(agent, position);
        inner.capabilities.insert(agent, capability);
    }

    /// Advance the shared clock.
    pub fn advance(&self, dt: f64) {
        self.lock().time += dt;
    }

    /// Move an agent (oracle update only; no protocol effect).
    pub fn set_position(&self, agent: AgentId, position: Point) {
        self.lock().positions.insert(agent, position);
    }

    /// Change the loss rate mid-run. Used to model partitions healing
    /// (probability 1.0 = full partition).
    pub fn set_drop_probability(&self, drop_probability: f64) {
        self.lock().drop_probability = drop_probability;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Environment for LossyEnv {
    fn send(&self, envelope: Envelope) {
        let mut inner = self.lock();
        let drop_probability = inner.drop_probability;
        // Roll per recipient: one send delivers to each inbox at most once,
        // and any subset of the fleet may miss it.
        let mut recipients: Vec<AgentId> = inner.inboxes.keys().copied().collect();
        // Sort so the per-recipient RNG rolls are consumed in a stable
        // order, keeping seeded loss patterns reproducible.
        recipients.sort();
        for recipient in recipients {
            if inner.rng.gen::<f64>() < drop_probability {
                tracing::trace!(
                    msg_id = %envelope.msg_id,
                    from = %envelope.from,
                    to = %recipient,
                    kind = envelope.payload.kind(),
                    "Dropped broadcast for recipient"
                );
                continue;
            }
            if let Some(inbox) = inner.inboxes.get_mut(&recipient) {
                inbox.push(envelope.clone());
            }
        }
    }

    fn receive(&self, agent: AgentId) -> Vec<Envelope> {
        let mut inner = self.lock();
        match inner.inboxes.get_mut(&agent) {
            Some(inbox) => std::mem::take(inbox),
            None => Vec::new(),
        }
    }

    fn now(&self) -> Timestamp {
        self.lock().time
    }

    fn neighbors(&self) -> Vec<AgentId> {
        let inner = self.lock();
        let mut ids: Vec<AgentId> = inner.positions.keys().copied().collect();
        ids.sort();
        ids
    }

    fn position(&self, agent: AgentId) -> Option<Point> {
        self.lock().positions.get(&agent).copied()
    }

    fn has_capability(&self, agent: AgentId, capability: &Capability) -> bool {
        self.lock().capabilities.get(&agent) == Some(capability)
    }
}
