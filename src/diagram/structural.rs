//! Graph-level structural diagnostics (S001–S010).
//!
//! Diagnostics never block anything: the repair pass and the mutators accept
//! diagrams that trip these rules. They exist so a caller can surface likely
//! authoring mistakes.

use std::collections::HashSet;

use petgraph::algo::is_cyclic_directed;
use petgraph::visit::Bfs;

use super::graph::DiagramGraph;
use super::parser::parse;
use super::types::{DiagramModel, NodeKind};
use crate::error::EngineError;

/// Parse `source` and run every structural rule over it.
pub fn diagnose(source: &str) -> Vec<EngineError> {
    let model = parse(source);
    diagnose_model(&model)
}

pub fn diagnose_model(model: &DiagramModel) -> Vec<EngineError> {
    let mut errors = Vec::new();
    if model.nodes.is_empty() {
        return errors;
    }
    let graph = DiagramGraph::build(model);

    s001_has_terminal(model, &mut errors);
    s002_no_implicit_nodes(model, &mut errors);
    s003_no_duplicate_connections(model, &mut errors);
    s004_no_cycles(&graph, &mut errors);
    s005_all_reachable_from_entry(model, &graph, &mut errors);
    s006_no_duplicate_declarations(model, &mut errors);
    s008_decision_has_branches(model, &graph, &mut errors);
    s010_no_self_loops(model, &mut errors);

    errors
}

fn s001_has_terminal(model: &DiagramModel, errors: &mut Vec<EngineError>) {
    if !model.nodes.iter().any(|n| n.kind == NodeKind::StartEnd) {
        errors.push(EngineError::validate(
            "S001",
            "Diagram has no start/end terminal node",
            None,
        ));
    }
}

fn s002_no_implicit_nodes(model: &DiagramModel, errors: &mut Vec<EngineError>) {
    for node in model.implicit_nodes() {
        errors.push(EngineError::validate(
            "S002",
            format!("Node '{}' is referenced but never declared", node.id),
            Some(node.id.clone()),
        ));
    }
}

fn s003_no_duplicate_connections(model: &DiagramModel, errors: &mut Vec<EngineError>) {
    let mut seen = HashSet::new();
    for connection in &model.connections {
        if !seen.insert((connection.from_id.as_str(), connection.to_id.as_str())) {
            errors.push(EngineError::validate(
                "S003",
                format!(
                    "Duplicate connection from '{}' to '{}' on line {}",
                    connection.from_id,
                    connection.to_id,
                    connection.source_line + 1
                ),
                Some(connection.from_id.clone()),
            ));
        }
    }
}

fn s004_no_cycles(graph: &DiagramGraph, errors: &mut Vec<EngineError>) {
    if is_cyclic_directed(&graph.graph) {
        errors.push(EngineError::validate(
            "S004",
            "Diagram contains a cycle (rework loop)",
            None,
        ));
    }
}

/// Entry nodes are nodes without incoming connections. A diagram that is
/// one big loop has none and is skipped.
fn s005_all_reachable_from_entry(
    model: &DiagramModel,
    graph: &DiagramGraph,
    errors: &mut Vec<EngineError>,
) {
    let entries: Vec<_> = model
        .nodes
        .iter()
        .filter(|n| graph.incoming_count(&n.id) == 0)
        .filter_map(|n| graph.node_indices.get(&n.id).copied())
        .collect();
    if entries.is_empty() {
        return;
    }

    let mut reachable = HashSet::new();
    for entry in entries {
        let mut bfs = Bfs::new(&graph.graph, entry);
        while let Some(nx) = bfs.next(&graph.graph) {
            reachable.insert(nx);
        }
    }

    for node in &model.nodes {
        let Some(&idx) = graph.node_indices.get(&node.id) else {
            continue;
        };
        if !reachable.contains(&idx) {
            errors.push(EngineError::validate(
                "S005",
                format!("Node '{}' is not reachable from any entry node", node.id),
                Some(node.id.clone()),
            ));
        }
    }
}

fn s006_no_duplicate_declarations(model: &DiagramModel, errors: &mut Vec<EngineError>) {
    for id in &model.duplicate_declarations {
        errors.push(EngineError::validate(
            "S006",
            format!("Node '{}' is declared more than once; the first declaration is used", id),
            Some(id.clone()),
        ));
    }
}

fn s008_decision_has_branches(
    model: &DiagramModel,
    graph: &DiagramGraph,
    errors: &mut Vec<EngineError>,
) {
    for node in model.nodes.iter().filter(|n| n.kind == NodeKind::Decision) {
        let count = graph.outgoing_count(&node.id);
        if count < 2 {
            errors.push(EngineError::validate(
                "S008",
                format!(
                    "Decision node '{}' should have at least 2 outgoing connections, found {}",
                    node.id, count
                ),
                Some(node.id.clone()),
            ));
        }
    }
}

fn s010_no_self_loops(model: &DiagramModel, errors: &mut Vec<EngineError>) {
    for connection in &model.connections {
        if connection.from_id == connection.to_id {
            errors.push(EngineError::validate(
                "S010",
                format!("Self-loop detected on node '{}'", connection.from_id),
                Some(connection.from_id.clone()),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(source: &str) -> Vec<String> {
        diagnose(source).into_iter().map(|e| e.code).collect()
    }

    #[test]
    fn clean_diagram_has_no_diagnostics() {
        let src = "graph TD\nS([\"Start\"]) --> A[\"Work\"]\nA --> E([\"End\"])";
        assert!(codes(src).is_empty());
    }

    #[test]
    fn empty_diagram_has_no_diagnostics() {
        assert!(codes("").is_empty());
    }

    #[test]
    fn reports_implicit_and_missing_terminal() {
        assert_eq!(codes("graph TD\nA[\"x\"] --> B"), vec!["S001", "S002"]);
    }

    #[test]
    fn reports_decision_cycle_and_self_loop() {
        let src = "graph TD\nS([\"Start\"]) --> D{\"Ok?\"}\nD --> A[\"Fix\"]\nA --> D\nA --> A";
        assert_eq!(codes(src), vec!["S004", "S008", "S010"]);
    }

    #[test]
    fn reports_duplicates() {
        let src = "graph TD\nS([\"Start\"]) --> A[\"x\"]\nA[\"y\"]\nS --> A";
        assert_eq!(codes(src), vec!["S003", "S006"]);
    }
}
