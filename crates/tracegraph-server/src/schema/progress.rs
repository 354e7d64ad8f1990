//! Job progress payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One progress report from a running job.
///
/// `percent` is advisory: callers are expected to stay within 0..=100 but
/// nothing enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub percent: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ProgressUpdate {
    pub fn new(percent: f64, message: impl Into<String>) -> Self {
        ProgressUpdate {
            percent,
            message: message.into(),
            stage: None,
            metadata: None,
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Adds one metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_fields_are_omitted() {
        let value = serde_json::to_value(ProgressUpdate::new(50.0, "half")).unwrap();
        assert_eq!(value, json!({"percent": 50.0, "message": "half"}));
    }

    #[test]
    fn stage_and_metadata_serialize() {
        let update = ProgressUpdate::new(10.0, "building")
            .with_stage("build")
            .with_meta("nodes", 3);
        let value = serde_json::to_value(update).unwrap();
        assert_eq!(value["stage"], "build");
        assert_eq!(value["metadata"], json!({"nodes": 3}));
    }
}
