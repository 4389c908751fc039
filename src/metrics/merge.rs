//! Combining workflow- and document-derived metrics, and comparing an
//! original process against its optimized version.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::time::format_minutes_to_time;
use super::{MetricsSource, ProcessMetrics, StepTime, UNKNOWN_TIME, sort_steps};

/// Merge metrics extracted from a diagram with metrics extracted from a
/// document describing the same process.
///
/// Document steps win by step key and workflow steps only fill keys the
/// document lacks. `total_steps` is the larger of the two input counts and
/// the minute total is recomputed from the merged steps.
pub fn merge_metrics(workflow: &ProcessMetrics, document: &ProcessMetrics) -> ProcessMetrics {
    let document_keys: HashSet<&str> = document
        .step_times
        .iter()
        .map(|s| s.step.as_str())
        .collect();

    let mut steps: Vec<StepTime> = document.step_times.clone();
    steps.extend(
        workflow
            .step_times
            .iter()
            .filter(|s| !document_keys.contains(s.step.as_str()))
            .cloned(),
    );
    sort_steps(&mut steps);

    let mut merged = ProcessMetrics::from_steps(steps, MetricsSource::Merged);
    merged.total_steps = workflow.total_steps.max(document.total_steps);
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSavings {
    pub saved_minutes: u32,
    pub saved_time: String,
    /// Saved share of the original total, 0–100, one decimal place.
    pub percentage: f64,
    pub steps_saved: usize,
}

impl TimeSavings {
    pub fn unknown() -> Self {
        TimeSavings {
            saved_minutes: 0,
            saved_time: UNKNOWN_TIME.to_string(),
            percentage: 0.0,
            steps_saved: 0,
        }
    }
}

/// Savings of `optimized` over `original`, floored at zero. Either input
/// missing yields [`TimeSavings::unknown`].
pub fn calculate_time_savings(
    original: Option<&ProcessMetrics>,
    optimized: Option<&ProcessMetrics>,
) -> TimeSavings {
    let (Some(original), Some(optimized)) = (original, optimized) else {
        return TimeSavings::unknown();
    };

    let saved_minutes = original
        .total_time_minutes
        .saturating_sub(optimized.total_time_minutes);
    let percentage = if original.total_time_minutes == 0 {
        0.0
    } else {
        let raw = f64::from(saved_minutes) * 100.0 / f64::from(original.total_time_minutes);
        (raw * 10.0).round() / 10.0
    };

    TimeSavings {
        saved_minutes,
        saved_time: format_minutes_to_time(saved_minutes),
        percentage,
        steps_saved: original.total_steps.saturating_sub(optimized.total_steps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: &str, minutes: u32) -> StepTime {
        StepTime::new(n, format!("Step {}", n), Some(format!("{} minutes", minutes)))
    }

    #[test]
    fn document_steps_take_precedence() {
        let document = ProcessMetrics::from_steps(vec![step("1", 30)], MetricsSource::Document);
        let workflow =
            ProcessMetrics::from_steps(vec![step("1", 99), step("2", 20)], MetricsSource::Workflow);

        let merged = merge_metrics(&workflow, &document);
        assert_eq!(merged.source, MetricsSource::Merged);
        assert_eq!(merged.step_times[0].time_minutes, Some(30));
        assert_eq!(merged.step_times[1].time_minutes, Some(20));
        assert_eq!(merged.total_time_minutes, 50);
        assert_eq!(merged.total_steps, 2);
        assert_eq!(merged.total_time, "50 minutes");
    }

    #[test]
    fn total_steps_is_the_larger_input_count() {
        let document = ProcessMetrics::from_steps(
            vec![step("1", 5), step("2", 5), step("3", 5)],
            MetricsSource::Document,
        );
        let workflow = ProcessMetrics::from_steps(vec![step("1", 5)], MetricsSource::Workflow);
        assert_eq!(merge_metrics(&workflow, &document).total_steps, 3);
    }

    #[test]
    fn savings_are_floored_at_zero() {
        let original = ProcessMetrics::from_steps(vec![step("1", 120), step("2", 60)], MetricsSource::Workflow);
        let optimized = ProcessMetrics::from_steps(vec![step("1", 60)], MetricsSource::Optimized);

        let savings = calculate_time_savings(Some(&original), Some(&optimized));
        assert_eq!(savings.saved_minutes, 120);
        assert_eq!(savings.saved_time, "2 hours");
        assert_eq!(savings.percentage, 66.7);
        assert_eq!(savings.steps_saved, 1);

        let worse = calculate_time_savings(Some(&optimized), Some(&original));
        assert_eq!(worse.saved_minutes, 0);
        assert_eq!(worse.steps_saved, 0);
    }

    #[test]
    fn missing_input_is_unknown() {
        let savings = calculate_time_savings(None, None);
        assert_eq!(savings.saved_time, "Unknown");
    }
}
