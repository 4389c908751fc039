//! petgraph-based directed graph view over a parsed diagram.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};

use super::types::DiagramModel;

pub struct DiagramGraph {
    pub graph: DiGraph<String, Option<String>>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl DiagramGraph {
    /// Every connection endpoint resolves to a model node (implicit nodes
    /// included), so building never fails.
    pub fn build(model: &DiagramModel) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for node in &model.nodes {
            let idx = graph.add_node(node.id.clone());
            node_indices.insert(node.id.clone(), idx);
        }

        for connection in &model.connections {
            let source = node_indices.get(&connection.from_id);
            let target = node_indices.get(&connection.to_id);
            if let (Some(&s), Some(&t)) = (source, target) {
                graph.add_edge(s, t, connection.label.clone());
            }
        }

        DiagramGraph {
            graph,
            node_indices,
        }
    }

    pub fn successors(&self, node_id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn predecessors(&self, node_id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(node_id) else {
            return vec![];
        };
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn incoming_count(&self, node_id: &str) -> usize {
        self.predecessors(node_id).len()
    }

    pub fn outgoing_count(&self, node_id: &str) -> usize {
        self.successors(node_id).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::parse;

    #[test]
    fn counts_follow_connections() {
        let model = parse("graph TD\nA-->B\nA-->C\nB-->C");
        let graph = DiagramGraph::build(&model);
        assert_eq!(graph.outgoing_count("A"), 2);
        assert_eq!(graph.incoming_count("C"), 2);
        assert_eq!(graph.outgoing_count("missing"), 0);
    }
}
