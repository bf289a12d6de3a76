//! Parsing of `model_analyzer` reports.

use crate::commands::CommandBuilder;
use crate::error::PipelineError;
use crate::tool::{OutputMode, ToolRunner};
use std::path::Path;
use tracing::{debug, warn};

const REGISTERED_LABEL: &str = "Registered images:";
const POINTS_LABEL: &str = "Points:";

/// Counts reported for one sparse model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelStats {
    pub registered_images: u32,
    /// Zero when the report carried no point count.
    pub points: u64,
}

/// Integer following `label` on `line`, if the label starts a word.
///
/// Thousands separators are skipped, so `12,345` reads as 12345.
fn count_after_label(line: &str, label: &str) -> Option<u64> {
    for (pos, _) in line.match_indices(label) {
        let at_word_start = line[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_');
        if !at_word_start {
            continue;
        }

        let digits: String = line[pos + label.len()..]
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == ',')
            .filter(char::is_ascii_digit)
            .collect();
        if let Ok(value) = digits.parse() {
            return Some(value);
        }
    }
    None
}

/// Extract registered image and point counts from analyzer output.
///
/// Lines may carry a log prefix (`I0101 12:00:00 model.cc:42] Points: 10`).
/// Returns `None` if no registered image count is present.
pub fn parse_model_stats(text: &str) -> Option<ModelStats> {
    let mut registered = None;
    let mut points = None;

    for line in text.lines() {
        if registered.is_none() {
            registered = count_after_label(line, REGISTERED_LABEL);
        }
        if points.is_none() {
            points = count_after_label(line, POINTS_LABEL);
        }
    }

    let registered_images = u32::try_from(registered?).ok()?;
    Some(ModelStats {
        registered_images,
        points: points.unwrap_or(0),
    })
}

/// Run `model_analyzer` on `model` and parse its report.
///
/// A failed run or an unparseable report yields `Ok(None)`; only a failure to
/// launch the tool at all is an error.
pub fn analyze_model<R: ToolRunner>(
    runner: &R,
    commands: &CommandBuilder<'_>,
    model: &Path,
) -> Result<Option<ModelStats>, PipelineError> {
    let invocation = commands.model_analyzer(model);
    let output = runner.run(&invocation, OutputMode::Capture)?;

    if !output.is_success() {
        warn!(
            "model_analyzer failed on {} ({:?}), skipping",
            model.display(),
            output.code
        );
        return Ok(None);
    }

    let stats = parse_model_stats(&output.combined());
    match stats {
        Some(stats) => debug!(
            "{}: {} registered images, {} points",
            model.display(),
            stats.registered_images,
            stats.points
        ),
        None => warn!("No registered image count in analyzer output for {}", model.display()),
    }
    Ok(stats)
}
