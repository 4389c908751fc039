//! Step and time metrics read from process tables in a document.
//!
//! A table counts as a process table when its first row names an activity
//! column and at least one of a step or a time column.

use super::parser::parse_document;
use super::types::Section;
use crate::config::TimeConfig;
use crate::metrics::{MetricsSource, ProcessMetrics, StepTime, sort_steps};

const STEP_HEADERS: [&str; 4] = ["step", "no", "#", "number"];
const TIME_HEADERS: [&str; 5] = ["time", "duration", "estimate", "effort", "hours"];
const NAME_HEADERS: [&str; 6] = ["activity", "task", "description", "process", "action", "name"];

#[derive(Debug, Default)]
struct Columns {
    step: Option<usize>,
    name: Option<usize>,
    time: Option<usize>,
}

pub fn extract_document_metrics(html: &str) -> ProcessMetrics {
    extract_document_metrics_with(html, &TimeConfig::default())
}

pub fn extract_document_metrics_with(html: &str, config: &TimeConfig) -> ProcessMetrics {
    let doc = parse_document(html);
    let mut counter = 0u32;
    let mut steps = Vec::new();

    for section in &doc.sections {
        let Some(columns) = process_columns(section) else {
            continue;
        };
        for row in section.rows.iter().skip(1) {
            let text = |col: Option<usize>| {
                col.and_then(|c| row.cells.get(c))
                    .map(|c| c.plain_text.clone())
                    .filter(|t| !t.is_empty())
            };
            let Some(name) = text(columns.name) else {
                continue;
            };
            let step = text(columns.step).unwrap_or_else(|| {
                counter += 1;
                counter.to_string()
            });
            let step = step.trim_end_matches('.').to_string();
            steps.push(StepTime::new_with(step, name, text(columns.time), config));
        }
    }
    sort_steps(&mut steps);

    ProcessMetrics::from_steps_with(steps, MetricsSource::Document, config)
}

fn process_columns(section: &Section) -> Option<Columns> {
    let header = section.rows.first()?;
    let mut columns = Columns::default();
    for (idx, cell) in header.cells.iter().enumerate() {
        let text = cell.plain_text.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric() && c != '#')
            .filter(|w| !w.is_empty())
            .collect();
        let has = |list: &[&str]| words.iter().any(|w| list.contains(w));

        if columns.step.is_none() && has(&STEP_HEADERS) {
            columns.step = Some(idx);
        } else if columns.time.is_none() && has(&TIME_HEADERS) {
            columns.time = Some(idx);
        } else if columns.name.is_none() && has(&NAME_HEADERS) {
            columns.name = Some(idx);
        }
    }
    (columns.name.is_some() && (columns.step.is_some() || columns.time.is_some()))
        .then_some(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOP: &str = r#"
<h2>Procedure</h2>
<table>
  <tr><th>Step</th><th>Activity</th><th>Time Estimate</th></tr>
  <tr><td>2</td><td>Verify identity</td><td>30 minutes</td></tr>
  <tr><td>1</td><td>Receive application</td><td>1 hour</td></tr>
  <tr><td>3</td><td>Approve</td><td>TBD</td></tr>
</table>
<table><tr><th>Owner</th><th>Notes</th></tr><tr><td>Ops</td><td>-</td></tr></table>
"#;

    #[test]
    fn reads_process_tables_only() {
        let metrics = extract_document_metrics(SOP);
        assert_eq!(metrics.source, MetricsSource::Document);
        assert_eq!(metrics.total_steps, 3);
        let names: Vec<&str> = metrics.step_times.iter().map(|s| s.step_name.as_str()).collect();
        assert_eq!(names, vec!["Receive application", "Verify identity", "Approve"]);
        assert_eq!(metrics.total_time_minutes, 90);
        assert_eq!(metrics.step_times[2].time_minutes, None);
    }

    #[test]
    fn missing_step_column_numbers_rows() {
        let html = "<table><tr><th>Task</th><th>Duration</th></tr>\
                    <tr><td>Pack</td><td>2 hours</td></tr><tr><td>Ship</td><td>1 day</td></tr></table>";
        let metrics = extract_document_metrics(html);
        let keys: Vec<&str> = metrics.step_times.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(keys, vec!["1", "2"]);
        assert_eq!(metrics.total_time, "10 hours");
    }
}
