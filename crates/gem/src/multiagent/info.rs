//! Free-form per-agent info attached to reset and step results.

use serde::Serialize;
use serde_json::Value;

/// Information returned for one agent from `reset` or `step`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AgentInfo {
    /// Episode return (set when the agent finishes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_return: Option<f32>,
    /// Episode length in ticks (set when the agent finishes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_length: Option<u32>,
    /// Environment-specific entries
    pub extra: smallvec::SmallVec<[(&'static str, Value); 4]>,
}

impl AgentInfo {
    /// Create empty info
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len);
        self
    }

    /// Add an environment-specific entry, replacing any earlier value under
    /// the same key.
    pub fn with_extra(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.extra.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.extra.push((key, value)),
        }
        self
    }

    /// Look up an entry by key (including the episode stats)
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "episode_return" => self.episode_return.map(Value::from),
            "episode_length" => self.episode_length.map(Value::from),
            _ => self
                .extra
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.episode_return.is_none() && self.episode_length.is_none() && self.extra.is_empty()
    }
}
