//! Run configuration loaded from JSON and overridden by flags.

use std::path::Path;

use anyhow::{Context, Result};
use gem::rollout::RolloutConfig;
use gem_envs::{LineWalkConfig, SimpleParallelConfig};
use serde::{Deserialize, Serialize};

/// Everything a `demo` or `eval` run needs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub rollout: RolloutConfig,
    pub simple: SimpleParallelConfig,
    pub line_walk: LineWalkConfig,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply command-line overrides on top of the file (or defaults)
    pub fn with_overrides(
        mut self,
        seed: Option<u64>,
        agents: Option<usize>,
        max_ticks: Option<u32>,
    ) -> Self {
        if seed.is_some() {
            self.rollout.seed = seed;
        }
        if let Some(n) = agents {
            self.simple.num_agents = n;
            self.line_walk.num_agents = n;
        }
        if let Some(t) = max_ticks {
            self.simple.max_steps = t;
            self.line_walk.max_ticks = t;
        }
        self
    }
}
