//! Built-in parallel environments for gem.
//!
//! Provides simple environments for testing and demos:
//! - `SimpleParallel` - Scripted string actions with termination and truncation
//! - `LineWalk` - Seeded walkers racing to a goal on a 1D line

mod line_walk;
mod simple_parallel;

pub use line_walk::{LineWalk, LineWalkConfig, LineWalkState, Move};
pub use simple_parallel::{SimpleParallel, SimpleParallelConfig, SimpleState};
