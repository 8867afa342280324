//! Metric logging for episode drivers.
//!
//! Provides:
//! - `EpisodeReport`, the sorted scalars describing one episode
//! - `MetricLogger` trait for composable backends
//! - `ConsoleLogger` for lightweight logging through `tracing`
//! - `JsonLinesLogger` for one JSON object per episode
//! - `CompositeLogger` for multi-backend logging

mod console;
mod jsonl;
mod logger;

pub use console::ConsoleLogger;
pub use jsonl::JsonLinesLogger;
pub use logger::{CompositeLogger, EpisodeReport, MetricLogger, NoOpLogger};
