//! gem CLI
//!
//! Command-line interface for running parallel multi-agent environments.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use gem::log::{CompositeLogger, ConsoleLogger, JsonLinesLogger, MetricLogger};
use gem::multiagent::{AgentMap, EpisodeStats, ParallelEnv};
use gem::rollout::{run_episode, EpisodeSummary};
use gem_envs::{LineWalk, Move, SimpleParallel};

mod config;

use config::RunConfig;

const SIMPLE_ACTIONS: [&str; 4] = ["good", "bad", "neutral", "terminate"];

#[derive(Parser)]
#[command(name = "gem")]
#[command(version, about = "gem - Parallel multi-agent environments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available environments
    List,

    /// Run one episode with a scripted policy, rendering every tick
    Demo {
        /// Environment name
        #[arg(default_value = "simple")]
        env: String,

        /// Seed forwarded to reset
        #[arg(long)]
        seed: Option<u64>,

        /// Number of agents
        #[arg(long)]
        agents: Option<usize>,

        /// Tick limit enforced by the environment
        #[arg(long)]
        max_ticks: Option<u32>,
    },

    /// Evaluate a random policy over several episodes
    Eval {
        /// Environment name
        env: String,

        /// Number of episodes
        #[arg(long, default_value = "10")]
        episodes: usize,

        /// Seed forwarded to the first reset and the policy
        #[arg(long)]
        seed: Option<u64>,

        /// Number of agents
        #[arg(long)]
        agents: Option<usize>,

        /// Tick limit enforced by the environment
        #[arg(long)]
        max_ticks: Option<u32>,

        /// JSON run configuration
        #[arg(long)]
        config: Option<PathBuf>,

        /// Also write per-episode metrics as JSON lines to this file
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            list_envs();
        }
        Commands::Demo {
            env,
            seed,
            agents,
            max_ticks,
        } => {
            let config = RunConfig::default().with_overrides(seed, agents, max_ticks);
            demo(&env, &config)?;
        }
        Commands::Eval {
            env,
            episodes,
            seed,
            agents,
            max_ticks,
            config,
            metrics_out,
        } => {
            let base = match config {
                Some(path) => RunConfig::load(&path)?,
                None => RunConfig::default(),
            };
            let config = base.with_overrides(seed, agents, max_ticks);

            let mut logger = CompositeLogger::new(vec![Box::new(ConsoleLogger::new())]);
            if let Some(path) = metrics_out {
                logger.add(Box::new(JsonLinesLogger::create(path)?));
            }

            let result = eval(&env, episodes, &config, &logger);
            logger.close();
            result?;
        }
    }

    Ok(())
}

fn eval(
    env_name: &str,
    episodes: usize,
    config: &RunConfig,
    logger: &dyn MetricLogger,
) -> Result<()> {
    tracing::info!(
        env = env_name,
        episodes,
        seed = ?config.rollout.seed,
        "Starting evaluation (random policy)"
    );

    let mut rng = match config.rollout.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    // Only the first episode is seeded; later resets continue the env's own RNG
    let mut rollout = config.rollout.clone();
    let mut total_return = 0.0;

    match env_name {
        "simple" => {
            let mut env = EpisodeStats::new(SimpleParallel::with_config(config.simple.clone())?);
            for ep in 0..episodes {
                let summary = run_episode(
                    &mut env,
                    &rollout,
                    |_, _| {
                        SIMPLE_ACTIONS
                            .choose(&mut rng)
                            .copied()
                            .unwrap_or("neutral")
                            .to_string()
                    },
                    logger,
                    ep as u64,
                )?;
                log_finished(ep, &summary);
                total_return += summary.mean_return();
                rollout.seed = None;
            }
            env.close();
        }
        "linewalk" => {
            let mut env = EpisodeStats::new(LineWalk::with_config(config.line_walk.clone())?);
            for ep in 0..episodes {
                let summary = run_episode(
                    &mut env,
                    &rollout,
                    |_, _| Move::ALL.choose(&mut rng).copied().unwrap_or(Move::Stay),
                    logger,
                    ep as u64,
                )?;
                log_finished(ep, &summary);
                total_return += summary.mean_return();
                rollout.seed = None;
            }
            env.close();
        }
        _ => bail!("Unknown environment: {}", env_name),
    }

    let avg_return = if episodes > 0 {
        total_return / episodes as f32
    } else {
        0.0
    };
    tracing::info!(avg_return, "Evaluation complete");
    println!(
        "Evaluation complete: {} episodes, mean return {:.3}",
        episodes, avg_return
    );

    Ok(())
}

fn demo(env_name: &str, config: &RunConfig) -> Result<()> {
    tracing::info!(env = env_name, seed = ?config.rollout.seed, "Running demo");

    match env_name {
        "simple" => {
            let mut env = SimpleParallel::with_config(config.simple.clone())?;
            env.reset(config.rollout.seed)?;
            print_render(&env, 0);

            // The first active agent terminates on every other tick
            let mut tick = 0;
            while !env.is_done() && tick < config.rollout.max_ticks {
                tick += 1;
                let actions: AgentMap<String> = env
                    .agents()
                    .iter()
                    .enumerate()
                    .map(|(i, agent)| {
                        let action = if i == 0 && tick % 2 == 0 {
                            "terminate"
                        } else {
                            "good"
                        };
                        (agent.clone(), action.to_string())
                    })
                    .collect();

                let outcome = env.step(&actions)?;
                for agent in outcome.done_agents() {
                    tracing::info!(tick, agent = %agent, "Agent finished");
                }
                print_render(&env, tick);
            }
            env.close();
        }
        "linewalk" => {
            let mut env = LineWalk::with_config(config.line_walk.clone())?;
            env.reset(config.rollout.seed)?;
            print_render(&env, 0);

            // Odd-numbered walkers head left, the rest head right
            let mut tick = 0;
            while !env.is_done() && tick < config.rollout.max_ticks {
                tick += 1;
                let actions: AgentMap<Move> = env
                    .agents()
                    .iter()
                    .map(|agent| {
                        let odd = agent
                            .as_str()
                            .chars()
                            .last()
                            .and_then(|c| c.to_digit(10))
                            .is_some_and(|d| d % 2 == 1);
                        (agent.clone(), if odd { Move::Left } else { Move::Right })
                    })
                    .collect();

                let outcome = env.step(&actions)?;
                for agent in outcome.done_agents() {
                    tracing::info!(tick, agent = %agent, "Agent finished");
                }
                print_render(&env, tick);
            }
            env.close();
        }
        _ => bail!("Unknown environment: {}", env_name),
    }

    Ok(())
}

/// Per-agent stats attached by the `EpisodeStats` wrapper
fn log_finished(episode: usize, summary: &EpisodeSummary) {
    let mut finished: Vec<_> = summary.finished.iter().collect();
    finished.sort_by(|a, b| a.0.cmp(b.0));

    for (agent, info) in finished {
        if let (Some(ret), Some(len)) = (info.episode_return, info.episode_length) {
            tracing::info!(
                episode,
                agent = %agent,
                episode_return = ret,
                episode_length = len,
                "Agent episode stats"
            );
        }
    }
}

fn print_render<E: ParallelEnv>(env: &E, tick: u32) {
    if let Some(render) = env.render() {
        println!("Tick {}: \n{}", tick, render);
    }
}

fn list_envs() {
    println!("Available environments:");
    println!();
    println!("  simple     Scripted string actions (good/bad/neutral/terminate)");
    println!("             Tests: action validation, termination, truncation");
    println!();
    println!("  linewalk   Walkers racing to a goal on a 1D line");
    println!("             Tests: seeded dynamics, staggered agent retirement");
}
