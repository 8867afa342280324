//! Episode driver.
//!
//! Runs a [`ParallelEnv`] from `reset` until every agent has finished, asking
//! a policy for one action per active agent on each tick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::log::{EpisodeReport, MetricLogger};
use crate::multiagent::{AgentId, AgentInfo, AgentMap, ParallelEnv};
use crate::{GemError, Result};

/// Configuration for [`run_episode`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Seed forwarded to `reset`
    pub seed: Option<u64>,
    /// Hard cap on ticks per episode
    pub max_ticks: u32,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_ticks: 1_000,
        }
    }
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_ticks == 0 {
            return Err(GemError::Config("max_ticks must be positive".into()));
        }
        Ok(())
    }
}

/// Per-episode results
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Ticks executed
    pub ticks: u32,
    /// Sum of rewards for each agent
    pub returns: HashMap<AgentId, f32>,
    /// Ticks each agent was active for
    pub lengths: HashMap<AgentId, u32>,
    /// Whether `max_ticks` ended the episode while agents were still active
    pub capped: bool,
    /// Info each agent carried on the tick it terminated or was truncated
    #[serde(skip)]
    pub finished: AgentMap<AgentInfo>,
}

impl EpisodeSummary {
    pub fn total_return(&self) -> f32 {
        self.returns.values().sum()
    }

    pub fn mean_return(&self) -> f32 {
        if self.returns.is_empty() {
            0.0
        } else {
            self.total_return() / self.returns.len() as f32
        }
    }

    /// Report handed to a [`MetricLogger`]
    pub fn report(&self, episode: u64) -> EpisodeReport {
        EpisodeReport::new(episode)
            .with("episode/ticks", self.ticks as f64)
            .with("episode/agents", self.returns.len() as f64)
            .with("episode/mean_return", self.mean_return() as f64)
            .with("episode/total_return", self.total_return() as f64)
            .with("episode/capped", if self.capped { 1.0 } else { 0.0 })
    }
}

/// Run one episode.
///
/// `policy` is called once per active agent per tick with that agent's most
/// recent observation. `episode` is the index carried by the report sent to
/// `logger`.
pub fn run_episode<E, F>(
    env: &mut E,
    config: &RolloutConfig,
    mut policy: F,
    logger: &dyn MetricLogger,
    episode: u64,
) -> Result<EpisodeSummary>
where
    E: ParallelEnv,
    F: FnMut(&AgentId, &E::Observation) -> E::Action,
{
    config.validate()?;

    let (mut observations, _) = env.reset(config.seed)?;
    let mut summary = EpisodeSummary {
        returns: env.agents().iter().map(|a| (a.clone(), 0.0)).collect(),
        lengths: env.agents().iter().map(|a| (a.clone(), 0)).collect(),
        ..Default::default()
    };

    while !env.is_done() {
        if summary.ticks >= config.max_ticks {
            summary.capped = true;
            break;
        }

        let mut actions = AgentMap::with_capacity(env.num_agents());
        for agent in env.agents() {
            let observation = observations.get(agent).ok_or_else(|| {
                GemError::Env(format!("no observation for active agent {agent}"))
            })?;
            actions.insert(agent.clone(), policy(agent, observation));
        }

        let mut outcome = env.step(&actions)?;
        summary.ticks += 1;

        for (agent, reward) in &outcome.rewards {
            *summary.returns.entry(agent.clone()).or_insert(0.0) += reward;
            *summary.lengths.entry(agent.clone()).or_insert(0) += 1;
        }
        for agent in outcome.done_agents() {
            let info = outcome.infos.remove(&agent).unwrap_or_default();
            summary.finished.insert(agent, info);
        }
        observations = outcome.observations;
    }

    tracing::info!(
        episode,
        ticks = summary.ticks,
        mean_return = summary.mean_return(),
        capped = summary.capped,
        "Episode finished"
    );
    logger.log_episode(&summary.report(episode));

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NoOpLogger;
    use crate::multiagent::{AgentRoster, EpisodeStats, ResetOutcome, StepOutcome};

    /// Each agent observes its own counter and finishes once it reaches its index.
    struct Staircase {
        roster: AgentRoster,
        counters: AgentMap<u32>,
        seeds: Vec<Option<u64>>,
    }

    impl Staircase {
        fn new(n: usize) -> Self {
            Self {
                roster: AgentRoster::numbered("agent", n),
                counters: AgentMap::new(),
                seeds: Vec::new(),
            }
        }
    }

    impl ParallelEnv for Staircase {
        type Observation = u32;
        type Action = u32;
        type State = ();

        fn roster(&self) -> &AgentRoster {
            &self.roster
        }

        fn roster_mut(&mut self) -> &mut AgentRoster {
            &mut self.roster
        }

        fn reset_agents(&mut self, seed: Option<u64>) -> Result<ResetOutcome<u32>> {
            self.seeds.push(seed);
            self.counters = self.roster.agents().iter().map(|a| (a.clone(), 0)).collect();
            let agents = self.roster.agents();
            Ok((
                self.counters.clone(),
                agents.iter().map(|a| (a.clone(), AgentInfo::new())).collect(),
            ))
        }

        fn step_agents(&mut self, actions: &AgentMap<u32>) -> Result<StepOutcome<u32>> {
            let mut outcome = StepOutcome::new();
            for (agent, &action) in actions {
                let counter = self.counters.entry(agent.clone()).or_insert(0);
                *counter += action;
                let index: u32 = agent.as_str().trim_start_matches("agent").parse().unwrap_or(0);
                outcome.insert(
                    agent.clone(),
                    *counter,
                    1.0,
                    *counter >= index,
                    false,
                    AgentInfo::new(),
                );
            }
            Ok(outcome)
        }
    }

    #[test]
    fn test_run_episode_until_all_done() {
        let mut env = Staircase::new(3);
        let config = RolloutConfig {
            seed: Some(9),
            ..Default::default()
        };

        let mut calls = 0;
        let summary = run_episode(
            &mut env,
            &config,
            |_, _| {
                calls += 1;
                1
            },
            &NoOpLogger,
            0,
        )
        .unwrap();

        assert_eq!(summary.ticks, 3);
        assert!(!summary.capped);
        assert_eq!(summary.lengths["agent1"], 1);
        assert_eq!(summary.lengths["agent2"], 2);
        assert_eq!(summary.lengths["agent3"], 3);
        assert_eq!(summary.total_return(), 6.0);
        assert_eq!(calls, 6);
        assert_eq!(env.seeds, vec![Some(9)]);
        assert!(env.is_done());
    }

    #[test]
    fn test_run_episode_respects_tick_cap() {
        let mut env = Staircase::new(3);
        let config = RolloutConfig {
            seed: None,
            max_ticks: 2,
        };

        let summary = run_episode(&mut env, &config, |_, _| 1, &NoOpLogger, 0).unwrap();
        assert_eq!(summary.ticks, 2);
        assert!(summary.capped);
        assert_eq!(env.agents(), &[AgentId::from("agent3")]);
        assert_eq!(summary.report(0).get("episode/capped"), Some(1.0));
        assert_eq!(summary.finished.len(), 2);
        assert!(!summary.finished.contains_key("agent3"));
    }

    #[test]
    fn test_finished_infos_carry_episode_stats() {
        let mut env = EpisodeStats::new(Staircase::new(3));
        let summary =
            run_episode(&mut env, &RolloutConfig::default(), |_, _| 1, &NoOpLogger, 0).unwrap();

        assert_eq!(summary.finished.len(), 3);
        for (agent, info) in &summary.finished {
            assert_eq!(info.episode_length, Some(summary.lengths[agent]));
            assert_eq!(info.episode_return, Some(summary.returns[agent]));
        }
        assert_eq!(summary.finished["agent3"].episode_length, Some(3));
    }

    #[test]
    fn test_zero_tick_cap_rejected() {
        let mut env = Staircase::new(1);
        let config = RolloutConfig {
            seed: None,
            max_ticks: 0,
        };
        let err = run_episode(&mut env, &config, |_, _| 1, &NoOpLogger, 0).unwrap_err();
        assert!(matches!(err, GemError::Config(_)));
        assert!(env.seeds.is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let config: RolloutConfig = serde_json::from_str(r#"{"seed": 5}"#).unwrap();
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.max_ticks, 1_000);
    }
}
