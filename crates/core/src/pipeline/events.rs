//! # Progress Events
//!
//! Event types emitted by the pipeline at stage transitions. Events are
//! ephemeral: created per transition, handed to the reporter synchronously,
//! never persisted by the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest message an event will carry. Longer text is cut for display.
pub const MAX_MESSAGE_LEN: usize = 240;

/// State of a stage as seen by progress consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Not started yet.
    Pending,
    /// Generation call in flight.
    Active,
    /// Output accepted into the run context.
    Succeeded,
    /// Generation failed; the run aborts here.
    Failed,
}

/// A stage transition, as delivered to a [`ProgressReporter`].
///
/// [`ProgressReporter`]: crate::pipeline::reporter::ProgressReporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Name of the stage the transition belongs to.
    pub stage: String,
    /// New state of that stage.
    pub state: StageState,
    /// Free text for display: an excerpt on success, the error on failure.
    pub message: String,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create an event, bounding the message for display.
    pub fn new(stage: &str, state: StageState, message: &str) -> Self {
        Self {
            stage: stage.to_string(),
            state,
            message: truncate_for_display(message),
            timestamp: Utc::now(),
        }
    }
}

/// Cut `text` to [`MAX_MESSAGE_LEN`] characters, marking the cut.
fn truncate_for_display(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_LEN).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_kept_verbatim() {
        let event = ProgressEvent::new("analyst", StageState::Active, "starting");
        assert_eq!(event.message, "starting");
        assert_eq!(event.state, StageState::Active);
    }

    #[test]
    fn test_long_message_is_bounded() {
        let long = "x".repeat(MAX_MESSAGE_LEN * 2);
        let event = ProgressEvent::new("writer", StageState::Succeeded, &long);
        assert_eq!(event.message.chars().count(), MAX_MESSAGE_LEN + 1);
        assert!(event.message.ends_with('…'));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long = "ü".repeat(MAX_MESSAGE_LEN + 5);
        let event = ProgressEvent::new("writer", StageState::Succeeded, &long);
        assert_eq!(event.message.chars().count(), MAX_MESSAGE_LEN + 1);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&StageState::Succeeded).unwrap();
        assert_eq!(json, "\"succeeded\"");
    }
}
