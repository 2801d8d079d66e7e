//! # Dossier Core
//!
//! The "Brain" of the Dossier system - the briefing pipeline, progress
//! reporting, output splitting, and the LLM generation collaborator.
//!
//! ## Architecture
//!
//! - `pipeline/` - stages, per-run context, sequential runner, progress events/reporters
//! - `splitter` - sentinel-based document/slide separation
//! - `generate` / `llm` - the generation seam and its chat-completions implementation
//! - `models` - centralized LLM provider configuration
//! - `crew` - the default analyst/writer/presenter stage roster
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dossier_core::{crew, splitter, LlmGenerator, ModelConfig, TracingReporter};
//!
//! let generator = LlmGenerator::from_env(ModelConfig::default())?;
//! let result = crew::briefing_pipeline()
//!     .run("KI-Trends 2026", &generator, &TracingReporter)
//!     .await?;
//! let briefing = splitter::split(&result.final_text, crew::SLIDE_SENTINEL, crew::MIN_SLIDE_LEN);
//! ```

pub mod crew;
pub mod error;
pub mod generate;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod splitter;

pub use error::{GenerationError, PipelineError};
pub use generate::Generate;
pub use llm::LlmGenerator;
pub use models::{LlmProvider, ModelConfig};
pub use pipeline::{
    ChannelReporter, FanoutReporter, NullReporter, Pipeline, PipelineContext, PipelineResult,
    ProgressEvent, ProgressReporter, Stage, StageOutput, StageState, TracingReporter,
};
pub use splitter::{split, SplitResult};
