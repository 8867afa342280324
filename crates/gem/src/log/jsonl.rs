//! JSON-lines logging backend.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use super::{EpisodeReport, MetricLogger};
use crate::Result;

/// Logger that appends one JSON object per episode to a file.
pub struct JsonLinesLogger {
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesLogger {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl MetricLogger for JsonLinesLogger {
    fn log_episode(&self, report: &EpisodeReport) {
        if let Ok(mut writer) = self.writer.lock() {
            let written = serde_json::to_writer(&mut *writer, report)
                .map_err(std::io::Error::from)
                .and_then(|_| writer.write_all(b"\n"));
            if let Err(e) = written {
                tracing::warn!(
                    error = %e,
                    episode = report.episode,
                    "Failed to write metrics record"
                );
            }
        }
    }

    fn close(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_writes_one_line_per_episode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.jsonl");

        let logger = JsonLinesLogger::create(&path).unwrap();
        logger.log_episode(&EpisodeReport::new(0).with("episode/ticks", 3.0));
        logger.log_episode(
            &EpisodeReport::new(1)
                .with("episode/mean_return", 1.5)
                .with("episode/agents", 2.0),
        );
        logger.close();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["episode"], 0);
        assert_eq!(lines[0]["metrics"]["episode/ticks"], 3.0);
        assert_eq!(lines[1]["metrics"]["episode/mean_return"], 1.5);
        assert_eq!(lines[1]["metrics"]["episode/agents"], 2.0);
    }
}
