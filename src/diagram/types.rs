//! Structural model of a flowchart source.
//!
//! The model is rebuilt from the source string on every operation; nothing in
//! here is meant to outlive the source it was parsed from.

use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Process,
    Decision,
    StartEnd,
}

impl NodeKind {
    /// Opening and closing shape delimiters used when writing a declaration.
    pub fn delimiters(&self) -> (&'static str, &'static str) {
        match self {
            NodeKind::Process => ("[", "]"),
            NodeKind::Decision => ("{", "}"),
            NodeKind::StartEnd => ("([", "])"),
        }
    }
}

/// Textual form of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeForm {
    /// `a-->b`
    Plain,
    /// `a-->|"label"|b`
    Piped,
    /// `a-- label -->b`
    Inline,
}

/// Where a node's declaration sits in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub line: usize,
    pub id_span: Range<usize>,
    /// Span of the shape body (quotes included); `None` for a bare identifier.
    pub body_span: Option<Range<usize>>,
    /// True when the declaration is the whole statement on its line.
    pub standalone: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    /// Display text with the time-estimate suffix removed.
    pub label: String,
    /// Full original shape text.
    pub raw_label: String,
    pub time_estimate: Option<String>,
    /// `None` marks an implicit node.
    pub source_line: Option<usize>,
    /// Enclosing group titles, outermost first.
    pub group_memberships: Vec<String>,
    #[serde(skip)]
    pub(crate) declaration: Option<Declaration>,
}

impl Node {
    pub fn is_implicit(&self) -> bool {
        self.source_line.is_none()
    }

    /// Placeholder for an id that is referenced but never declared.
    pub(crate) fn placeholder(id: &str) -> Self {
        Node {
            id: id.to_string(),
            kind: NodeKind::Process,
            label: id.to_string(),
            raw_label: id.to_string(),
            time_estimate: None,
            source_line: None,
            group_memberships: vec![],
            declaration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from_id: String,
    pub to_id: String,
    pub label: Option<String>,
    pub source_line: usize,
    pub form: EdgeForm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub title: String,
    pub start_line: usize,
    pub end_line: usize,
    pub member_node_ids: Vec<String>,
}

impl Group {
    /// True when `line` lies strictly between the opener and the closer.
    pub fn contains_line(&self, line: usize) -> bool {
        line > self.start_line && line < self.end_line
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramModel {
    /// Direction token of the directive line, if any (`TD`, `LR`, …).
    pub direction: Option<String>,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub groups: Vec<Group>,
    /// Ids declared more than once; the first declaration is the one kept.
    pub duplicate_declarations: Vec<String>,
}

impl DiagramModel {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn is_implicit(&self, id: &str) -> bool {
        self.node(id).is_some_and(Node::is_implicit)
    }

    pub fn implicit_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_implicit())
    }

    pub fn connections_between<'a>(
        &'a self,
        from_id: &'a str,
        to_id: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.from_id == from_id && c.to_id == to_id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty() && self.groups.is_empty()
    }
}
