//! Core configuration for lazy-switch-core.

use serde::{Deserialize, Serialize};

use crate::error::SwitchError;

/// Runtime-wide settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed for the randomized-advance generator. `None` seeds from entropy.
    pub rng_seed: Option<u64>,

    /// Seconds before a respawn retries targets whose pool is owned elsewhere.
    pub respawn_retry_delay: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rng_seed: None,
            respawn_retry_delay: 0.5,
        }
    }
}

impl Config {
    pub fn from_json(s: &str) -> Result<Self, SwitchError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }
}

/// How the consolidation pass treats the live state of bound targets.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FixupMode {
    /// Sample the live state of each target and keep it as-is.
    #[default]
    AsIs,
    /// Trust the authored grouping and force live state to match at build.
    OnBuild,
    /// Trust the authored grouping; the runtime re-applies when enabled.
    OnEnable,
}
