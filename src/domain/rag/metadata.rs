use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form request metadata sent by the frontend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatMetadata(pub Map<String, Value>);

impl ChatMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Session id from `thread_id`, falling back to `session_id`.
    /// Blank values count as absent.
    pub fn session_id(&self) -> Option<&str> {
        ["thread_id", "session_id"]
            .iter()
            .filter_map(|key| self.0.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .find(|id| !id.is_empty())
    }
}
