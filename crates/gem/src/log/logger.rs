//! Episode reports and the sinks that receive them.

use std::collections::BTreeMap;

use serde::Serialize;

/// Named scalars describing one finished episode.
///
/// Metrics are kept sorted by name so every backend emits them in the same
/// order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub episode: u64,
    pub metrics: BTreeMap<String, f64>,
}

impl EpisodeReport {
    pub fn new(episode: u64) -> Self {
        Self {
            episode,
            metrics: BTreeMap::new(),
        }
    }

    /// Add or overwrite a metric
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Destination for episode reports.
pub trait MetricLogger: Send + Sync {
    fn log_episode(&self, report: &EpisodeReport);

    /// Flush pending output. Called once after the last episode.
    fn close(&self) {}
}

/// Discards every report.
pub struct NoOpLogger;

impl MetricLogger for NoOpLogger {
    fn log_episode(&self, _report: &EpisodeReport) {}
}

/// Forwards each report to every inner logger, in insertion order.
#[derive(Default)]
pub struct CompositeLogger {
    sinks: Vec<Box<dyn MetricLogger>>,
}

impl CompositeLogger {
    pub fn new(sinks: Vec<Box<dyn MetricLogger>>) -> Self {
        Self { sinks }
    }

    pub fn add(&mut self, sink: Box<dyn MetricLogger>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FromIterator<Box<dyn MetricLogger>> for CompositeLogger {
    fn from_iter<I: IntoIterator<Item = Box<dyn MetricLogger>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl MetricLogger for CompositeLogger {
    fn log_episode(&self, report: &EpisodeReport) {
        self.sinks.iter().for_each(|sink| sink.log_episode(report));
    }

    fn close(&self) {
        self.sinks.iter().for_each(|sink| sink.close());
    }
}
