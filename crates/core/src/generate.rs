//! # Generation Seam
//!
//! The pipeline's only collaborator: something that turns the accumulated
//! context plus one stage's instructions into text. The shipped
//! implementation is [`LlmGenerator`](crate::llm::LlmGenerator); tests use
//! scripted stand-ins.

use crate::error::GenerationError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::stage::Stage;
use async_trait::async_trait;

/// External text generation, invoked once per stage.
///
/// The call blocks the run until a result or error is produced. Rate
/// limiting, budgets, and retry policy all live behind this trait, not in
/// the pipeline.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(
        &self,
        ctx: &PipelineContext,
        stage: &Stage,
    ) -> Result<String, GenerationError>;
}
