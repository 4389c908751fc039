#![allow(dead_code)]

use procflow::diagram::syntax::{Statement, classify};

// =============================================================================
// Fixtures
// =============================================================================

/// Customer onboarding flowchart: a group, a rework loop, an implicit node.
pub const ONBOARDING: &str = include_str!("../fixtures/onboarding.mmd");

/// Typical LLM output: fenced, smart quotes, odd arrows, a node named `end`,
/// a misspelled closer and an unclosed group.
pub const LLM_MESSY: &str = include_str!("../fixtures/llm_messy.mmd");

/// Two process tables (heading-titled and captioned) plus loose text.
pub const SOP: &str = include_str!("../fixtures/sop.html");

// =============================================================================
// Assertions
// =============================================================================

/// Indices of lines that differ between two sources of equal line count.
pub fn changed_lines(before: &str, after: &str) -> Vec<usize> {
    let before: Vec<&str> = before.split('\n').collect();
    let after: Vec<&str> = after.split('\n').collect();
    assert_eq!(before.len(), after.len(), "line count changed");
    (0..before.len()).filter(|&i| before[i] != after[i]).collect()
}

/// True when group openers and closers nest correctly as a stack.
pub fn groups_balanced(source: &str) -> bool {
    let mut depth = 0usize;
    for line in source.split('\n') {
        match classify(line) {
            Statement::GroupOpen { .. } => depth += 1,
            Statement::GroupClose => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0
}

pub fn opener_count(source: &str) -> usize {
    source
        .split('\n')
        .filter(|l| matches!(classify(l), Statement::GroupOpen { .. }))
        .count()
}

pub fn closer_count(source: &str) -> usize {
    source
        .split('\n')
        .filter(|l| matches!(classify(l), Statement::GroupClose))
        .count()
}
