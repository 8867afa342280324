//! Console logging backend.

use super::{EpisodeReport, MetricLogger};

/// Logger that prints each report as one `tracing` line.
pub struct ConsoleLogger;

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

impl MetricLogger for ConsoleLogger {
    fn log_episode(&self, report: &EpisodeReport) {
        let fields: Vec<String> = report
            .metrics
            .iter()
            .map(|(key, value)| format!("{}={:.4}", key, value))
            .collect();

        tracing::info!("Episode {}: {}", report.episode, fields.join(", "));
    }
}
