//! # Pipeline Context
//!
//! The per-run accumulation of stage outputs. Created fresh for every run
//! and owned by it exclusively; later stages read what earlier stages wrote.

use serde::{Deserialize, Serialize};

/// Output of one completed stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageOutput {
    /// Name of the stage that produced the text.
    pub stage: String,
    /// The generated text, unmodified.
    pub text: String,
}

/// Accumulated state of a single pipeline run.
///
/// The topic is read-only after creation; outputs are appended by the
/// pipeline, one entry per completed stage, in execution order.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    topic: String,
    outputs: Vec<StageOutput>,
}

impl PipelineContext {
    /// Start a fresh context for one run.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            outputs: Vec::new(),
        }
    }

    /// The original user-supplied topic.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Outputs of the stages completed so far, in execution order.
    pub fn outputs(&self) -> &[StageOutput] {
        &self.outputs
    }

    /// Record a completed stage. Only the pipeline appends.
    pub(crate) fn push(&mut self, stage: impl Into<String>, text: impl Into<String>) {
        self.outputs.push(StageOutput {
            stage: stage.into(),
            text: text.into(),
        });
    }

    /// Hand the accumulated outputs to the caller.
    pub(crate) fn into_outputs(self) -> Vec<StageOutput> {
        self.outputs
    }
}
