//! Step and time metrics extracted from a flowchart.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::parser::parse;
use super::types::{Node, NodeKind};
use crate::config::TimeConfig;
use crate::metrics::{MetricsSource, ProcessMetrics, StepTime, sort_steps};

/// Words marking a node as a terminal, a branch or a title rather than a step.
const NON_STEP_WORDS: [&str; 7] = ["start", "end", "begin", "finish", "stop", "decision", "title"];

fn numbered_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:step|activity|task|stage|phase)\s*#?\s*(\d+)").expect("valid regex")
    })
}

fn digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

pub fn extract_metrics(source: &str) -> ProcessMetrics {
    extract_metrics_with(source, &TimeConfig::default())
}

pub fn extract_metrics_with(source: &str, config: &TimeConfig) -> ProcessMetrics {
    let model = parse(source);

    let step_nodes: Vec<&Node> = model.nodes.iter().filter(|n| is_step(n)).collect();
    let numbered: Vec<Option<String>> = step_nodes.iter().map(|n| step_number(n)).collect();
    let taken: HashSet<String> = numbered.iter().flatten().cloned().collect();

    let mut counter = 0u64;
    let mut steps: Vec<StepTime> = Vec::with_capacity(step_nodes.len());
    for (node, number) in step_nodes.into_iter().zip(numbered) {
        let step = number.unwrap_or_else(|| loop {
            counter += 1;
            let key = counter.to_string();
            if !taken.contains(&key) {
                break key;
            }
        });
        steps.push(StepTime::new_with(
            step,
            node.label.clone(),
            node.time_estimate.clone(),
            config,
        ));
    }
    sort_steps(&mut steps);

    ProcessMetrics::from_steps_with(steps, MetricsSource::Workflow, config)
}

fn is_step(node: &Node) -> bool {
    node.kind == NodeKind::Process
        && !words(&node.id)
            .chain(words(&node.label))
            .any(|w| NON_STEP_WORDS.contains(&w.as_str()))
}

/// Lowercased words of `text`, also split at camelCase boundaries so
/// `endProcess` yields `end` and `process`.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in text.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.into_iter()
}

/// Explicit "Step N" phrase in the label, else digits in the id. Nodes
/// with neither are numbered by a counter over discovery order that skips
/// every key already claimed explicitly.
fn step_number(node: &Node) -> Option<String> {
    let raw = numbered_phrase()
        .captures(&node.label)
        .map(|caps| caps[1].to_string())
        .or_else(|| digits().find(&node.id).map(|m| m.as_str().to_string()))?;
    Some(raw.parse::<u64>().map_or(raw, |n| n.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONBOARDING: &str = r#"graph TD
    S(["Start"]) --> A["Collect documents (2 hours)"]
    A --> B{"Complete?"}
    B -->|"No"| A
    B -->|"Yes"| C["Step 3: Review (1 day)"]
    C --> D["Archive"]
    D --> E(["End"])"#;

    #[test]
    fn steps_exclude_terminals_and_decisions() {
        let metrics = extract_metrics(ONBOARDING);
        let names: Vec<&str> = metrics.step_times.iter().map(|s| s.step_name.as_str()).collect();
        assert_eq!(names, vec!["Collect documents", "Archive", "Step 3: Review"]);
        assert_eq!(metrics.total_steps, 3);
    }

    #[test]
    fn step_numbers_follow_label_then_id_then_position() {
        let metrics = extract_metrics(ONBOARDING);
        let keys: Vec<&str> = metrics.step_times.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);

        let numbered = extract_metrics("graph TD\nP7[\"Ship\"] --> P2[\"Pack\"]");
        let keys: Vec<&str> = numbered.step_times.iter().map(|s| s.step.as_str()).collect();
        assert_eq!(keys, vec!["2", "7"]);
    }

    #[test]
    fn total_is_sum_of_known_step_times() {
        let metrics = extract_metrics(ONBOARDING);
        assert_eq!(metrics.total_time_minutes, 120 + 480);
        assert_eq!(metrics.total_time, "10 hours");
        assert_eq!(metrics.source, MetricsSource::Workflow);
    }

    #[test]
    fn counter_skips_explicit_keys() {
        let metrics = extract_metrics(
            "graph TD\nA[\"Receive\"] --> B[\"Step 2: Approve\"]\nB --> C[\"Archive (1 hour)\"]",
        );
        let keys: Vec<(&str, &str)> = metrics
            .step_times
            .iter()
            .map(|s| (s.step.as_str(), s.step_name.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![("1", "Receive"), ("2", "Step 2: Approve"), ("3", "Archive")]
        );
    }

    #[test]
    fn camel_case_terminal_ids_are_not_steps() {
        let metrics = extract_metrics("graph TD\nA[\"Work\"] --> endProcess[\"Done\"]");
        assert_eq!(metrics.total_steps, 1);
    }
}
