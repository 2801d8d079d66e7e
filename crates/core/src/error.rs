//! # Error Taxonomy
//!
//! Two error families cross the pipeline boundary: `GenerationError` comes
//! from the external generation collaborator, `PipelineError` is what a run
//! returns to its caller.

use crate::pipeline::context::StageOutput;
use thiserror::Error;

/// Failure reported by the generation collaborator for a single stage call.
///
/// The pipeline never recovers from these itself; retry/backoff (if any)
/// happens inside the collaborator, beneath the `generate` call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The service refused the request due to rate limiting. The caller may
    /// wait and retry the whole run.
    #[error("rate limited by the generation service: {0}")]
    RateLimited(String),

    /// Network or service failure that is likely to pass.
    #[error("transient generation failure: {0}")]
    Transient(String),

    /// Anything the collaborator could not classify.
    #[error("generation failed: {0}")]
    Unclassified(String),
}

/// Failure of a whole pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Stage `stage` failed and the remaining stages were not run.
    ///
    /// `completed` holds the outputs accumulated before the failure, so the
    /// caller can inspect partial progress instead of losing it.
    #[error("stage '{stage}' aborted the run: {cause}")]
    StageAborted {
        stage: String,
        cause: GenerationError,
        completed: Vec<StageOutput>,
    },

    /// The pipeline was asked to run with no stages.
    #[error("pipeline has no stages")]
    EmptyStages,
}

impl PipelineError {
    /// Name of the stage that caused the abort, if any.
    pub fn failed_stage(&self) -> Option<&str> {
        match self {
            PipelineError::StageAborted { stage, .. } => Some(stage),
            PipelineError::EmptyStages => None,
        }
    }

    /// Outputs that completed before the failure.
    pub fn completed_outputs(&self) -> &[StageOutput] {
        match self {
            PipelineError::StageAborted { completed, .. } => completed,
            PipelineError::EmptyStages => &[],
        }
    }
}
