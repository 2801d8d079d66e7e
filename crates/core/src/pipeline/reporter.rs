//! # Progress Reporters
//!
//! The reporter is the narrow seam between the pipeline and whatever renders
//! progress: a log, an SSE feed, a test probe. `report` takes no return
//! value and has no permitted failure; a sink that cannot deliver drops the
//! event. Reporters are injected into the run rather than reached through
//! process-global state.

use super::events::{ProgressEvent, StageState};
use tokio::sync::broadcast;

/// Receives stage transitions from a running pipeline.
///
/// Implementations must not block the run beyond display latency and must
/// not fail; the pipeline additionally contains panics from `report`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Logs transitions through `tracing`.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: &ProgressEvent) {
        match event.state {
            StageState::Failed => {
                tracing::warn!(stage = %event.stage, "stage failed: {}", event.message)
            }
            _ => {
                tracing::info!(stage = %event.stage, state = ?event.state, "{}", event.message)
            }
        }
    }
}

/// Forwards events into a broadcast channel, e.g. for an SSE feed.
///
/// Sending never blocks; if no receiver is subscribed the event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: broadcast::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressReporter for ChannelReporter {
    fn report(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Delivers every event to each wrapped reporter, in order.
#[derive(Default)]
pub struct FanoutReporter {
    sinks: Vec<Box<dyn ProgressReporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ProgressReporter + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl ProgressReporter for FanoutReporter {
    fn report(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            sink.report(event);
        }
    }
}

/// Discards everything. For headless runs and tests.
#[derive(Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: &ProgressEvent) {}
}
