//! # Pipeline Stages
//!
//! A stage is one unit of work, mapped to a single generation call. All
//! variation between stages lives in their instruction text; the pipeline
//! treats every stage the same way, so there is no stage trait hierarchy.

use serde::{Deserialize, Serialize};

/// One unit of pipeline work.
///
/// Immutable once built. Stages carry no mutable state, so a set of stages
/// may be shared by concurrent runs; only the per-run context is exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    /// Identifier, unique within a pipeline. Used in progress reporting.
    pub name: String,
    /// What the generation collaborator should do. Opaque to the pipeline.
    pub instructions: String,
    /// Optional hint about the shape of the output, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

impl Stage {
    /// Create a stage without an expected-output hint.
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            expected_output: None,
        }
    }

    /// Attach an expected-output hint.
    pub fn with_expected_output(mut self, hint: impl Into<String>) -> Self {
        self.expected_output = Some(hint.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_builder() {
        let stage = Stage::new("analyst", "Analyze the topic.").with_expected_output("3 key points");
        assert_eq!(stage.name, "analyst");
        assert_eq!(stage.expected_output.as_deref(), Some("3 key points"));
    }

    #[test]
    fn test_stage_serialization_skips_missing_hint() {
        let stage = Stage::new("writer", "Write the report.");
        let json = serde_json::to_string(&stage).unwrap();
        assert!(!json.contains("expected_output"));
    }
}
