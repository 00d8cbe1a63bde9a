use serde::Deserialize;
use thiserror::Error;

/// Control-loop tick rate. Decoupled from the heartbeat rate so gossip
/// bandwidth is bounded independent of tick granularity.
pub const DEFAULT_TICK_HZ: f64 = 10.0;
/// Heartbeat throttle, seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL: f64 = 1.0;
/// Leader declared dead after this much silence, seconds. Must be at least
/// 2x the heartbeat interval so a single lost heartbeat is not a false
/// positive.
pub const DEFAULT_LEADER_TIMEOUT: f64 = 2.5;
/// Assignment stability window, seconds. A locked task is not re-evaluated
/// within this window.
pub const DEFAULT_STABILITY_WINDOW: f64 = 60.0;
/// Per-tick probability of re-broadcasting an existing assignment. This is
/// the delivery-retry mechanism on the lossy channel.
pub const DEFAULT_REGOSSIP_PROBABILITY: f64 = 0.4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse agent config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunable timing and gossip parameters of the agent control loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub tick_hz: f64,
    pub heartbeat_interval: f64,
    pub leader_timeout: f64,
    pub stability_window: f64,
    pub regossip_probability: f64,
    /// Seed for the agent's gossip-retry RNG (None = entropy). Seeded runs
    /// are reproducible end to end when the environment is seeded too.
    pub rng_seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            leader_timeout: DEFAULT_LEADER_TIMEOUT,
            stability_window: DEFAULT_STABILITY_WINDOW,
            regossip_probability: DEFAULT_REGOSSIP_PROBABILITY,
            rng_seed: None,
        }
    }
}

impl AgentConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Duration of one tick.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.tick_hz)
    }
}
