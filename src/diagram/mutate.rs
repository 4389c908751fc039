//! Diagram mutator.
//!
//! Every operation takes the whole source, re-parses it, checks its
//! preconditions, edits only the lines it must, and returns a brand-new source
//! that has been through the syntax validator. A failed precondition returns
//! an error before anything is written.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::parser::{ParsedSource, analyze};
use super::repair::{self, rename_closer_references};
use super::syntax::{self, CLOSER_KEYWORD, Statement};
use super::types::{DiagramModel, Node, NodeKind};
use super::writer::{
    SourceEditor, format_edge, format_node, indent_of, sanitize_label, with_time_suffix,
};
use crate::error::EngineError;

/// Identifiers the DSL reserves; a new node may not be named after one.
const RESERVED_IDS: [&str; 11] = [
    "end",
    "subgraph",
    "graph",
    "flowchart",
    "style",
    "classdef",
    "class",
    "click",
    "linkstyle",
    "direction",
    "default",
];

/// Lowest node count `remove_node` will leave behind.
const MIN_NODES: usize = 2;

const DEFAULT_INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default = "default_kind")]
    pub kind: NodeKind,
    #[serde(default)]
    pub time_estimate: Option<String>,
    #[serde(default)]
    pub connect_from: Option<String>,
    #[serde(default)]
    pub connect_to: Option<String>,
    #[serde(default)]
    pub connection_label: Option<String>,
}

fn default_kind() -> NodeKind {
    NodeKind::Process
}

impl NewNode {
    pub fn new(label: impl Into<String>) -> Self {
        NewNode {
            id: None,
            label: label.into(),
            kind: NodeKind::Process,
            time_estimate: None,
            connect_from: None,
            connect_to: None,
            connection_label: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInsertion {
    pub source: String,
    pub node_id: String,
}

// ---------------------------------------------------------------------------
// Label and time edits
// ---------------------------------------------------------------------------

/// Replace (or append) the parenthesized time suffix of a node's label.
/// An empty `estimate` removes the suffix. Implicit nodes are materialized.
pub fn set_node_time_estimate(
    source: &str,
    node_id: &str,
    estimate: &str,
) -> Result<String, EngineError> {
    let parsed = analyze(source);
    let node = find_node(&parsed.model, node_id)?;
    let estimate = sanitize_label(estimate);
    let base = syntax::split_time_suffix(&node.raw_label).0;
    let text = with_time_suffix(&base, Some(&estimate));

    debug!("setting time estimate of '{}' to '{}'", node_id, estimate);
    let mut editor = SourceEditor::new(&parsed.lines);
    write_label(&parsed, &mut editor, node, &text);
    Ok(finish(editor))
}

/// Replace a node's label text, keeping any time-estimate suffix.
pub fn set_node_label(source: &str, node_id: &str, new_label: &str) -> Result<String, EngineError> {
    let parsed = analyze(source);
    let node = find_node(&parsed.model, node_id)?;
    let label = checked_label(new_label, Some(node_id.to_string()))?;
    let text = with_time_suffix(&label, node.time_estimate.as_deref());

    debug!("relabelling '{}'", node_id);
    let mut editor = SourceEditor::new(&parsed.lines);
    write_label(&parsed, &mut editor, node, &text);
    Ok(finish(editor))
}

/// Set the label of the first connection `from_id → to_id`, rewriting an
/// unlabelled edge into the piped form. An empty label removes it.
pub fn set_connection_label(
    source: &str,
    from_id: &str,
    to_id: &str,
    new_label: &str,
) -> Result<String, EngineError> {
    let parsed = analyze(source);
    let connection = parsed
        .model
        .connections_between(from_id, to_id)
        .next()
        .ok_or_else(|| connection_not_found(from_id, to_id))?;

    let line_idx = connection.source_line;
    let Statement::Edge(edge) = &parsed.statements[line_idx] else {
        return Err(connection_not_found(from_id, to_id));
    };
    let line = parsed.lines[line_idx];
    let label = sanitize_label(new_label).replace('|', "/");
    let rewritten = format_edge(
        &line[edge.from.span.clone()],
        &line[edge.to.span.clone()],
        Some(&label),
    );

    let mut editor = SourceEditor::new(&parsed.lines);
    editor.splice(line_idx, edge.span.clone(), &rewritten);
    Ok(finish(editor))
}

fn write_label(parsed: &ParsedSource<'_>, editor: &mut SourceEditor, node: &Node, text: &str) {
    match &node.declaration {
        Some(decl) => match &decl.body_span {
            Some(body) => editor.splice(decl.line, body.clone(), &format!("\"{}\"", text)),
            None => editor.splice(
                decl.line,
                decl.id_span.clone(),
                &format_node(&node.id, node.kind, text),
            ),
        },
        None => {
            debug!("materializing implicit node '{}'", node.id);
            let (slot, indent) = declaration_slot(parsed);
            editor.insert_before(
                slot,
                format!("{}{}", indent, format_node(&node.id, node.kind, text)),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Node insertion and removal
// ---------------------------------------------------------------------------

/// Declare a new node after the last declaration, optionally wiring it to
/// existing nodes.
pub fn add_node(source: &str, new_node: &NewNode) -> Result<NodeInsertion, EngineError> {
    let parsed = analyze(source);
    let model = &parsed.model;

    let label = checked_label(&new_node.label, new_node.id.clone())?;
    let node_id = match new_node.id.as_deref().map(sanitize_id) {
        Some(id) if !id.is_empty() => {
            if model.contains_node(&id) {
                return Err(EngineError::mutate(
                    "M003",
                    format!("Node '{}' already exists", id),
                    Some(id),
                ));
            }
            disambiguate(model, &id)
        }
        _ => generate_id(model),
    };
    for endpoint in [&new_node.connect_from, &new_node.connect_to]
        .into_iter()
        .flatten()
    {
        find_node(model, endpoint)?;
    }

    let (slot, indent) = declaration_slot(&parsed);
    let text = with_time_suffix(&label, new_node.time_estimate.as_deref());
    let mut editor = SourceEditor::new(&parsed.lines);
    editor.insert_before(
        slot,
        format!("{}{}", indent, format_node(&node_id, new_node.kind, &text)),
    );

    let mut edge_label = new_node
        .connection_label
        .as_deref()
        .map(|l| sanitize_label(l).replace('|', "/"));
    if let Some(from) = &new_node.connect_from {
        let edge = format_edge(from, &node_id, edge_label.take().as_deref());
        editor.insert_before(slot, format!("{}{}", indent, edge));
    }
    if let Some(to) = &new_node.connect_to {
        let edge = format_edge(&node_id, to, edge_label.take().as_deref());
        editor.insert_before(slot, format!("{}{}", indent, edge));
    }

    debug!("added node '{}'", node_id);
    Ok(NodeInsertion {
        source: finish(editor),
        node_id,
    })
}

/// Delete a node's declaration and every connection touching it.
pub fn remove_node(source: &str, node_id: &str) -> Result<String, EngineError> {
    let parsed = analyze(source);
    let model = &parsed.model;
    let node = find_node(model, node_id)?;
    if model.nodes.len() <= MIN_NODES {
        return Err(node_floor(node_id, model.nodes.len()));
    }

    let mut editor = SourceEditor::new(&parsed.lines);

    if node_id == CLOSER_KEYWORD {
        let replacement = crate::config::DiagramConfig::default().reserved_word_replacement;
        for (idx, statement) in parsed.statements.iter().enumerate() {
            if matches!(statement, Statement::Other) {
                editor.set_line(idx, rename_closer_references(parsed.lines[idx], &replacement));
            }
        }
    }

    if let Some(decl) = node.declaration.as_ref().filter(|d| d.standalone) {
        editor.remove(decl.line);
    }
    let edge_lines: BTreeSet<usize> = model
        .connections
        .iter()
        .filter(|c| c.from_id == node_id || c.to_id == node_id)
        .map(|c| c.source_line)
        .collect();
    for line in edge_lines {
        remove_edge_line(&parsed, &mut editor, line, Some(node_id));
    }
    for (idx, line) in parsed.lines.iter().enumerate() {
        if styles_node(line, node_id) {
            editor.remove(idx);
        }
    }

    let result = finish(editor);
    let remaining = super::parse(&result).nodes.len();
    if remaining < MIN_NODES {
        return Err(node_floor(node_id, remaining));
    }
    debug!("removed node '{}'", node_id);
    Ok(result)
}

/// `style X …` / `click X …` statements that only make sense while X exists.
fn styles_node(line: &str, node_id: &str) -> bool {
    let mut words = line.split_whitespace();
    matches!(words.next(), Some("style" | "click")) && words.next() == Some(node_id)
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Add an edge between two existing nodes after the last existing edge.
pub fn add_connection(
    source: &str,
    from_id: &str,
    to_id: &str,
    label: Option<&str>,
) -> Result<String, EngineError> {
    let parsed = analyze(source);
    let model = &parsed.model;
    find_node(model, from_id)?;
    find_node(model, to_id)?;
    if model.connections_between(from_id, to_id).next().is_some() {
        return Err(EngineError::mutate(
            "M006",
            format!("Connection from '{}' to '{}' already exists", from_id, to_id),
            Some(from_id.to_string()),
        ));
    }

    let label = label.map(|l| sanitize_label(l).replace('|', "/"));
    let edge = format_edge(from_id, to_id, label.as_deref());
    let mut editor = SourceEditor::new(&parsed.lines);

    let last_edge = parsed
        .statements
        .iter()
        .rposition(|s| matches!(s, Statement::Edge(_)));
    match last_edge {
        Some(idx) => {
            editor.insert_after(idx, format!("{}{}", indent_of(parsed.lines[idx]), edge));
        }
        None => {
            let (slot, indent) = declaration_slot(&parsed);
            editor.insert_before(slot, format!("{}{}", indent, edge));
        }
    }
    Ok(finish(editor))
}

/// Delete every edge `from_id → to_id`, whatever its textual form. A missing
/// edge is logged, not an error.
pub fn remove_connection(source: &str, from_id: &str, to_id: &str) -> Result<String, EngineError> {
    let parsed = analyze(source);
    let lines: BTreeSet<usize> = parsed
        .model
        .connections_between(from_id, to_id)
        .map(|c| c.source_line)
        .collect();
    if lines.is_empty() {
        warn!("no connection from '{}' to '{}' to remove", from_id, to_id);
        return Ok(repair::validate(source));
    }

    let mut editor = SourceEditor::new(&parsed.lines);
    for line in lines {
        remove_edge_line(&parsed, &mut editor, line, None);
    }
    Ok(finish(editor))
}

/// Remove an edge line, first re-emitting any node declaration written
/// inline on it (except the one for `dropped`) as a standalone line.
fn remove_edge_line(
    parsed: &ParsedSource<'_>,
    editor: &mut SourceEditor,
    line_idx: usize,
    dropped: Option<&str>,
) {
    let line = parsed.lines[line_idx];
    if let Statement::Edge(edge) = &parsed.statements[line_idx] {
        for shape in [&edge.from, &edge.to] {
            if shape.body.is_none() || Some(shape.id.as_str()) == dropped {
                continue;
            }
            let declared_here = parsed
                .model
                .node(&shape.id)
                .and_then(|n| n.declaration.as_ref())
                .is_some_and(|d| d.line == line_idx && d.id_span == shape.id_span);
            if declared_here {
                editor.insert_before(
                    line_idx,
                    format!("{}{}", indent_of(line), &line[shape.span.clone()]),
                );
            }
        }
    }
    editor.remove(line_idx);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn finish(editor: SourceEditor) -> String {
    repair::validate(&editor.finish())
}

fn find_node<'m>(model: &'m DiagramModel, node_id: &str) -> Result<&'m Node, EngineError> {
    model
        .node(node_id)
        .ok_or_else(|| EngineError::unknown_node(node_id))
}

fn connection_not_found(from_id: &str, to_id: &str) -> EngineError {
    EngineError::mutate(
        "M002",
        format!("No connection from '{}' to '{}'", from_id, to_id),
        Some(from_id.to_string()),
    )
}

fn node_floor(node_id: &str, count: usize) -> EngineError {
    EngineError::mutate(
        "M004",
        format!(
            "Cannot remove node '{}': the diagram must keep at least {} nodes (it has {})",
            node_id, MIN_NODES, count
        ),
        Some(node_id.to_string()),
    )
}

fn checked_label(label: &str, node_id: Option<String>) -> Result<String, EngineError> {
    let label = sanitize_label(label);
    if label.is_empty() {
        return Err(EngineError::mutate("M005", "Label must not be empty", node_id));
    }
    Ok(label)
}

fn sanitize_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if syntax::is_id_char(c) { c } else { '_' })
        .collect()
}

fn is_reserved(id: &str) -> bool {
    RESERVED_IDS.contains(&id.to_ascii_lowercase().as_str())
}

/// Suffix a reserved id until it is neither reserved nor taken.
fn disambiguate(model: &DiagramModel, id: &str) -> String {
    if !is_reserved(id) {
        return id.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", id, n))
        .find(|candidate| !model.contains_node(candidate))
        .unwrap_or_else(|| format!("{}_node", id))
}

/// First unused single letter, then `N1`, `N2`, …
fn generate_id(model: &DiagramModel) -> String {
    ('A'..='Z')
        .map(|c| c.to_string())
        .find(|id| !model.contains_node(id))
        .or_else(|| {
            (1..)
                .map(|n| format!("N{}", n))
                .find(|id| !model.contains_node(id))
        })
        .unwrap_or_else(|| format!("N{}", model.nodes.len() + 1))
}

/// Original line index before which a new declaration goes, and its indent:
/// after the last top-level declaration, else before the first edge, else
/// after the directive, else at the end.
fn declaration_slot(parsed: &ParsedSource<'_>) -> (usize, String) {
    let in_group = |line: usize| parsed.model.groups.iter().any(|g| g.contains_line(line));
    let indent_at = |line: usize| indent_of(parsed.lines[line]).to_string();

    let last_decl = parsed
        .statements
        .iter()
        .enumerate()
        .filter(|(i, s)| matches!(s, Statement::Node(_)) && !in_group(*i))
        .map(|(i, _)| i)
        .next_back();
    if let Some(line) = last_decl {
        return (line + 1, indent_at(line));
    }

    let edges: Vec<usize> = parsed
        .statements
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, Statement::Edge(_)))
        .map(|(i, _)| i)
        .collect();
    let first_edge = edges
        .iter()
        .copied()
        .find(|&i| !in_group(i))
        .or_else(|| edges.first().copied());
    if let Some(line) = first_edge {
        return (line, indent_at(line));
    }

    if let Some(line) = parsed
        .statements
        .iter()
        .position(|s| matches!(s, Statement::Direction(_)))
    {
        return (line + 1, DEFAULT_INDENT.to_string());
    }

    let trailing_blank = parsed
        .lines
        .iter()
        .rev()
        .take_while(|l| l.trim().is_empty())
        .count();
    (parsed.lines.len() - trailing_blank, DEFAULT_INDENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_skip_used_letters() {
        let model = super::super::parse("graph TD\nA-->B\nB-->C");
        assert_eq!(generate_id(&model), "D");
    }

    #[test]
    fn reserved_ids_are_suffixed() {
        let model = super::super::parse("graph TD\nA-->B\nend_1[\"x\"]");
        assert_eq!(disambiguate(&model, "end"), "end_2");
        assert_eq!(disambiguate(&model, "Review"), "Review");
    }

    #[test]
    fn sanitizes_ids() {
        assert_eq!(sanitize_id(" step 4 "), "step_4");
    }
}
