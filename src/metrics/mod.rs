//! Process metrics: step counts and time totals derived from a diagram or a
//! document, plus merging and before/after comparison.

pub mod merge;
pub mod time;

use serde::{Deserialize, Serialize};

use crate::config::TimeConfig;

pub use merge::{TimeSavings, calculate_time_savings, merge_metrics};
pub use time::{format_minutes_to_time, parse_time_to_minutes};

/// Display string used wherever a duration is not known.
pub const UNKNOWN_TIME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricsSource {
    Document,
    Workflow,
    Merged,
    Optimized,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTime {
    /// Step key, usually a number (`"3"`).
    pub step: String,
    pub step_name: String,
    pub time: Option<String>,
    /// `None` when `time` is absent or unparseable; never a stand-in zero.
    pub time_minutes: Option<u32>,
}

impl StepTime {
    pub fn new(step: impl Into<String>, step_name: impl Into<String>, time: Option<String>) -> Self {
        Self::new_with(step, step_name, time, &TimeConfig::default())
    }

    pub fn new_with(
        step: impl Into<String>,
        step_name: impl Into<String>,
        time: Option<String>,
        config: &TimeConfig,
    ) -> Self {
        let time_minutes = time
            .as_deref()
            .and_then(|t| time::parse_time_to_minutes_with(t, config));
        StepTime {
            step: step.into(),
            step_name: step_name.into(),
            time,
            time_minutes,
        }
    }

    fn numeric_step(&self) -> Option<u64> {
        self.step.trim().parse().ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMetrics {
    pub total_steps: usize,
    pub total_time: String,
    pub total_time_minutes: u32,
    pub step_times: Vec<StepTime>,
    pub source: MetricsSource,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl ProcessMetrics {
    /// Build metrics whose totals are derived from `step_times`. The minute
    /// total saturates instead of overflowing.
    pub fn from_steps(step_times: Vec<StepTime>, source: MetricsSource) -> Self {
        Self::from_steps_with(step_times, source, &TimeConfig::default())
    }

    pub fn from_steps_with(
        step_times: Vec<StepTime>,
        source: MetricsSource,
        config: &TimeConfig,
    ) -> Self {
        let total_time_minutes = step_times
            .iter()
            .filter_map(|s| s.time_minutes)
            .fold(0u32, u32::saturating_add);
        ProcessMetrics {
            total_steps: step_times.len(),
            total_time: time::format_minutes_to_time_with(total_time_minutes, config),
            total_time_minutes,
            step_times,
            source,
            timestamp: None,
        }
    }

    /// Metrics standing in for a failed extraction.
    pub fn error() -> Self {
        Self::from_steps(Vec::new(), MetricsSource::Error).with_total_time_override(UNKNOWN_TIME)
    }

    /// Replace the display total with an upstream-provided string. The
    /// numeric total is left as the step sum.
    pub fn with_total_time_override(mut self, total_time: impl Into<String>) -> Self {
        self.total_time = total_time.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_source(mut self, source: MetricsSource) -> Self {
        self.source = source;
        self
    }
}

/// Sort steps by numeric key ascending; non-numeric keys go last in their
/// original order.
pub fn sort_steps(steps: &mut [StepTime]) {
    steps.sort_by_key(|s| match s.numeric_step() {
        Some(n) => (false, n),
        None => (true, 0),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(n: &str, time: Option<&str>) -> StepTime {
        StepTime::new(n, format!("Step {}", n), time.map(str::to_string))
    }

    #[test]
    fn totals_skip_unknown_times() {
        let metrics = ProcessMetrics::from_steps(
            vec![step("1", Some("1 hour")), step("2", Some("tbd")), step("3", Some("30 min"))],
            MetricsSource::Workflow,
        );
        assert_eq!(metrics.total_steps, 3);
        assert_eq!(metrics.total_time_minutes, 90);
        assert_eq!(metrics.total_time, "1 hour 30 minutes");
        assert_eq!(metrics.step_times[1].time_minutes, None);
    }

    #[test]
    fn huge_totals_saturate() {
        let metrics = ProcessMetrics::from_steps(
            vec![step("1", Some("1000000 weeks")), step("2", Some("1000000 weeks"))],
            MetricsSource::Workflow,
        );
        assert_eq!(metrics.step_times[0].time_minutes, Some(2_400_000_000));
        assert_eq!(metrics.total_time_minutes, u32::MAX);
    }

    #[test]
    fn numeric_steps_sort_first() {
        let mut steps = vec![step("b", None), step("10", None), step("2", None), step("a", None)];
        sort_steps(&mut steps);
        let keys: Vec<&str> = steps.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(keys, vec!["2", "10", "b", "a"]);
    }

    #[test]
    fn error_metrics_display_unknown() {
        let metrics = ProcessMetrics::error();
        assert_eq!(metrics.source, MetricsSource::Error);
        assert_eq!(metrics.total_time, "Unknown");
        assert_eq!(metrics.total_time_minutes, 0);
    }
}
