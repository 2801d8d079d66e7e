//! # Default Briefing Crew
//!
//! The stock stage roster: an analyst gathers key findings, a writer turns
//! them into a report, a presenter appends a slide deck. The presenter is
//! told to reproduce the report and separate slides with the sentinel, so
//! the final text can be split back into a document and slide fragments.

use crate::pipeline::{Pipeline, Stage};

/// Literal marker the presenter stage places between slides.
///
/// Chosen so it will not show up in ordinary generated prose; changing it
/// here changes both the stage instructions and the splitter call sites.
pub const SLIDE_SENTINEL: &str = "---SLIDE---";

/// Slide fragments shorter than this (after trimming) are dropped as noise.
pub const MIN_SLIDE_LEN: usize = 10;

/// The analyst → writer → presenter roster.
pub fn briefing_stages() -> Vec<Stage> {
    vec![
        Stage::new(
            "analyst",
            "Research the given topic and identify the most important findings, \
             developments, and open questions.",
        )
        .with_expected_output("A bullet list of key findings"),
        Stage::new(
            "writer",
            "Using the analyst's findings, write a well-structured report on the \
             topic with an introduction, one section per major finding, and a \
             conclusion.",
        )
        .with_expected_output("A complete report in Markdown"),
        Stage::new(
            "presenter",
            format!(
                "Reproduce the writer's report in full, then append a slide deck \
                 summarizing it. Put the marker {SLIDE_SENTINEL} before each \
                 slide, including the first. Each slide is a short title line \
                 followed by at most five bullet points."
            ),
        )
        .with_expected_output("The full report, then sentinel-separated slides"),
    ]
}

/// Ready-made pipeline over [`briefing_stages`].
pub fn briefing_pipeline() -> Pipeline {
    Pipeline::new(briefing_stages())
}
