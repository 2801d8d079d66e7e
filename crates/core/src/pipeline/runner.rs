//! # Pipeline Runner
//!
//! Runs the stages of a briefing strictly in order, feeding each stage the
//! outputs of every stage before it. One generation call per stage, no
//! retries, no concurrency; a failing stage aborts the rest of the run.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use super::context::{PipelineContext, StageOutput};
use super::events::{ProgressEvent, StageState};
use super::reporter::ProgressReporter;
use super::stage::Stage;
use crate::error::PipelineError;
use crate::generate::Generate;

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Output of the last stage. The last stage is expected to produce the
    /// complete briefing; earlier outputs are available in `outputs`.
    pub final_text: String,
    /// Every stage's output, in execution order.
    pub outputs: Vec<StageOutput>,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// An ordered sequence of stages with a sequential executor.
///
/// A `Pipeline` holds no per-run state; each call to [`run`](Self::run)
/// builds a fresh [`PipelineContext`], so one pipeline value can serve
/// consecutive runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every stage in order against `topic`.
    ///
    /// Per stage: an `Active` event, one `generate` call, then either a
    /// `Succeeded` event and an appended output, or a `Failed` event and an
    /// immediate abort. Later stages assume all earlier outputs are present,
    /// so there is no skip-and-continue. The generation call may take tens
    /// of seconds; any backoff happens inside the collaborator.
    ///
    /// Callers must validate the topic beforehand; an empty stage list is
    /// rejected here.
    pub async fn run(
        &self,
        topic: &str,
        generator: &dyn Generate,
        reporter: &dyn ProgressReporter,
    ) -> Result<PipelineResult, PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::EmptyStages);
        }

        let started = Instant::now();
        let mut ctx = PipelineContext::new(topic);

        for stage in &self.stages {
            notify(
                reporter,
                ProgressEvent::new(&stage.name, StageState::Active, "starting"),
            );

            match generator.generate(&ctx, stage).await {
                Ok(output) => {
                    notify(
                        reporter,
                        ProgressEvent::new(&stage.name, StageState::Succeeded, &output),
                    );
                    ctx.push(&stage.name, output);
                }
                Err(cause) => {
                    notify(
                        reporter,
                        ProgressEvent::new(&stage.name, StageState::Failed, &cause.to_string()),
                    );
                    return Err(PipelineError::StageAborted {
                        stage: stage.name.clone(),
                        cause,
                        completed: ctx.into_outputs(),
                    });
                }
            }
        }

        let final_text = ctx
            .outputs()
            .last()
            .map(|output| output.text.clone())
            .unwrap_or_default();

        Ok(PipelineResult {
            final_text,
            outputs: ctx.into_outputs(),
            elapsed: started.elapsed(),
        })
    }
}

/// Hand an event to the reporter, containing anything it does wrong.
/// A broken display sink must not take the run down with it.
fn notify(reporter: &dyn ProgressReporter, event: ProgressEvent) {
    let _ = catch_unwind(AssertUnwindSafe(|| reporter.report(&event)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::pipeline::reporter::NullReporter;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Returns canned results in order, one per generate call.
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Result<String, GenerationError>>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl Generate for ScriptedGenerator {
        async fn generate(
            &self,
            _ctx: &PipelineContext,
            _stage: &Stage,
        ) -> Result<String, GenerationError> {
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("generator called more times than scripted")
        }
    }

    /// Records which (stage, state) transitions were reported.
    #[derive(Clone, Default)]
    struct RecordingReporter {
        seen: Arc<Mutex<Vec<(String, StageState)>>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: &ProgressEvent) {
            self.seen
                .lock()
                .unwrap()
                .push((event.stage.clone(), event.state));
        }
    }

    struct PanickingReporter;

    impl ProgressReporter for PanickingReporter {
        fn report(&self, _event: &ProgressEvent) {
            panic!("display sink is broken");
        }
    }

    fn three_stages() -> Vec<Stage> {
        vec![
            Stage::new("analyst", "Analyze."),
            Stage::new("writer", "Write."),
            Stage::new("presenter", "Present."),
        ]
    }

    #[tokio::test]
    async fn test_all_stages_succeed_in_order() {
        let pipeline = Pipeline::new(three_stages());
        let generator = ScriptedGenerator::new(vec![
            Ok("out1".into()),
            Ok("out2".into()),
            Ok("out3".into()),
        ]);

        let result = pipeline
            .run("rust adoption", &generator, &NullReporter)
            .await
            .unwrap();

        assert_eq!(result.outputs.len(), 3);
        let order: Vec<&str> = result.outputs.iter().map(|o| o.stage.as_str()).collect();
        assert_eq!(order, vec!["analyst", "writer", "presenter"]);
    }

    #[tokio::test]
    async fn test_final_text_is_last_stage_output() {
        let pipeline = Pipeline::new(three_stages());
        let generator = ScriptedGenerator::new(vec![
            Ok("out1".into()),
            Ok("out2".into()),
            Ok("out3".into()),
        ]);

        let result = pipeline
            .run("rust adoption", &generator, &NullReporter)
            .await
            .unwrap();

        assert_eq!(result.final_text, "out3");
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_stages() {
        let pipeline = Pipeline::new(three_stages());
        let generator = ScriptedGenerator::new(vec![
            Ok("out1".into()),
            Err(GenerationError::Transient("connection reset".into())),
            // The presenter result must never be requested.
        ]);
        let reporter = RecordingReporter::default();

        let err = pipeline
            .run("rust adoption", &generator, &reporter)
            .await
            .unwrap_err();

        assert_eq!(err.failed_stage(), Some("writer"));
        assert_eq!(err.completed_outputs().len(), 1);
        assert_eq!(err.completed_outputs()[0].stage, "analyst");

        let seen = reporter.seen.lock().unwrap();
        assert!(!seen.iter().any(|(stage, _)| stage == "presenter"));
        assert_eq!(
            seen.last().unwrap(),
            &("writer".to_string(), StageState::Failed)
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_partial_outputs_in_error() {
        let pipeline = Pipeline::new(three_stages());
        let generator = ScriptedGenerator::new(vec![
            Ok("out1".into()),
            Ok("out2".into()),
            Err(GenerationError::RateLimited("429".into())),
        ]);

        let err = pipeline
            .run("rust adoption", &generator, &NullReporter)
            .await
            .unwrap_err();

        match err {
            PipelineError::StageAborted {
                stage,
                cause,
                completed,
            } => {
                assert_eq!(stage, "presenter");
                assert_eq!(cause, GenerationError::RateLimited("429".into()));
                assert_eq!(completed.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_stage_sequence_is_rejected() {
        let pipeline = Pipeline::new(Vec::new());
        let generator = ScriptedGenerator::new(vec![]);

        let err = pipeline
            .run("rust adoption", &generator, &NullReporter)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyStages));
    }

    #[tokio::test]
    async fn test_panicking_reporter_does_not_fail_the_run() {
        let pipeline = Pipeline::new(vec![
            Stage::new("analyst", "Analyze."),
            Stage::new("writer", "Write."),
        ]);
        let generator =
            ScriptedGenerator::new(vec![Ok("out1".into()), Ok("out2".into())]);

        let result = pipeline
            .run("rust adoption", &generator, &PanickingReporter)
            .await
            .unwrap();

        assert_eq!(result.outputs.len(), 2);
        assert_eq!(result.final_text, "out2");
    }

    #[tokio::test]
    async fn test_progress_event_sequence_for_success() {
        let pipeline = Pipeline::new(vec![Stage::new("analyst", "Analyze.")]);
        let generator = ScriptedGenerator::new(vec![Ok("findings".into())]);
        let reporter = RecordingReporter::default();

        pipeline
            .run("rust adoption", &generator, &reporter)
            .await
            .unwrap();

        let seen = reporter.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("analyst".to_string(), StageState::Active),
                ("analyst".to_string(), StageState::Succeeded),
            ]
        );
    }
}
