//! Diagram parser: flowchart source → `DiagramModel`.
//!
//! Never fails. Malformed input degrades to a partial model: unclosed groups
//! are closed at end of source, undeclared endpoints become implicit nodes and
//! unrecognized lines are ignored structurally.

use std::collections::HashMap;

use log::debug;

use super::syntax::{self, ShapeToken, Statement};
use super::types::*;

/// A source split into lines, with each line classified and the model built.
pub(crate) struct ParsedSource<'a> {
    pub lines: Vec<&'a str>,
    pub statements: Vec<Statement>,
    pub model: DiagramModel,
}

/// Parse a flowchart source into its structural model.
pub fn parse(source: &str) -> DiagramModel {
    analyze(source).model
}

pub(crate) fn analyze(source: &str) -> ParsedSource<'_> {
    let lines: Vec<&str> = source.split('\n').collect();
    let statements: Vec<Statement> = lines.iter().map(|l| syntax::classify(l)).collect();

    if source.trim().is_empty() {
        return ParsedSource {
            lines,
            statements,
            model: DiagramModel::default(),
        };
    }

    // 1. Group boundaries
    let mut groups = collect_groups(&statements, lines.len());

    // 2. Nodes and connections
    let mut builder = ModelBuilder::default();
    for (idx, statement) in statements.iter().enumerate() {
        match statement {
            Statement::Direction(direction) => {
                if builder.direction.is_none() {
                    builder.direction = direction.clone();
                }
            }
            Statement::Node(shape) => builder.declare(shape, idx, true),
            Statement::Edge(edge) => {
                if edge.from.body.is_some() {
                    builder.declare(&edge.from, idx, false);
                }
                if edge.to.body.is_some() {
                    builder.declare(&edge.to, idx, false);
                }
                builder.connections.push(Connection {
                    from_id: edge.from.id.clone(),
                    to_id: edge.to.id.clone(),
                    label: edge.label.clone(),
                    source_line: idx,
                    form: edge.form,
                });
            }
            _ => {}
        }
    }

    // 3. Implicit nodes
    let endpoints: Vec<String> = builder
        .connections
        .iter()
        .flat_map(|c| [c.from_id.clone(), c.to_id.clone()])
        .collect();
    for id in endpoints {
        if builder.index.contains_key(&id) {
            continue;
        }
        let node = match find_declaration_anywhere(&lines, &statements, &id) {
            Some((line, shape)) => {
                debug!("node '{}' resolved from out-of-band declaration on line {}", id, line);
                node_from_shape(&shape, line, false)
            }
            None => {
                debug!("node '{}' is referenced but never declared", id);
                Node::placeholder(&id)
            }
        };
        builder.push(node);
    }

    // 4. Group membership
    let mut nodes = builder.nodes;
    for node in nodes.iter_mut() {
        let Some(line) = node.source_line else {
            continue;
        };
        for group in groups.iter_mut().filter(|g| g.contains_line(line)) {
            node.group_memberships.push(group.title.clone());
            group.member_node_ids.push(node.id.clone());
        }
        let label_less = node
            .declaration
            .as_ref()
            .is_some_and(|d| d.body_span.is_none());
        if label_less && node.group_memberships.len() == 1 {
            node.label = format!("{}: {}", node.group_memberships[0], node.id);
        }
    }

    let model = DiagramModel {
        direction: builder.direction,
        nodes,
        connections: builder.connections,
        groups,
        duplicate_declarations: builder.duplicates,
    };

    ParsedSource {
        lines,
        statements,
        model,
    }
}

#[derive(Default)]
struct ModelBuilder {
    direction: Option<String>,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    duplicates: Vec<String>,
}

impl ModelBuilder {
    fn declare(&mut self, shape: &ShapeToken, line: usize, standalone: bool) {
        if self.index.contains_key(&shape.id) {
            debug!("duplicate declaration of '{}' on line {} ignored", shape.id, line);
            if !self.duplicates.contains(&shape.id) {
                self.duplicates.push(shape.id.clone());
            }
            return;
        }
        self.push(node_from_shape(shape, line, standalone));
    }

    fn push(&mut self, node: Node) {
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }
}

fn collect_groups(statements: &[Statement], line_count: usize) -> Vec<Group> {
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut groups = Vec::new();

    for (idx, statement) in statements.iter().enumerate() {
        match statement {
            Statement::GroupOpen { title } => stack.push((title.clone(), idx)),
            Statement::GroupClose => match stack.pop() {
                Some((title, start_line)) => groups.push(Group {
                    title,
                    start_line,
                    end_line: idx,
                    member_node_ids: vec![],
                }),
                None => debug!("closer on line {} has no open group", idx),
            },
            _ => {}
        }
    }

    while let Some((title, start_line)) = stack.pop() {
        debug!("group '{}' opened on line {} is never closed", title, start_line);
        groups.push(Group {
            title,
            start_line,
            end_line: line_count,
            member_node_ids: vec![],
        });
    }

    groups.sort_by_key(|g| g.start_line);
    groups
}

pub(crate) fn node_from_shape(shape: &ShapeToken, line: usize, standalone: bool) -> Node {
    let (label, raw_label, time_estimate) = match &shape.body {
        Some(body) => {
            let raw = body.text.trim().to_string();
            let (label, time) = syntax::split_time_suffix(&raw);
            (label, raw, time)
        }
        None => (shape.id.clone(), shape.id.clone(), None),
    };

    Node {
        id: shape.id.clone(),
        kind: shape.kind,
        label,
        raw_label,
        time_estimate,
        source_line: Some(line),
        group_memberships: vec![],
        declaration: Some(Declaration {
            line,
            id_span: shape.id_span.clone(),
            body_span: shape.body.as_ref().map(|b| b.span.clone()),
            standalone,
        }),
    }
}

/// Search lines the statement pass did not read structurally for a shape
/// declaration of `id`. The first declaration found wins.
fn find_declaration_anywhere(
    lines: &[&str],
    statements: &[Statement],
    id: &str,
) -> Option<(usize, ShapeToken)> {
    for (idx, line) in lines.iter().enumerate() {
        if matches!(statements[idx], Statement::Node(_) | Statement::Edge(_)) {
            continue;
        }
        for (pos, _) in line.match_indices(id) {
            let boundary = line[..pos]
                .chars()
                .next_back()
                .is_none_or(|c| !syntax::is_id_char(c));
            if !boundary {
                continue;
            }
            if let Some(shape) = syntax::parse_shape(line, pos, line.len()) {
                if shape.id == id && shape.body.is_some() {
                    return Some((idx, shape));
                }
            }
        }
    }
    None
}
