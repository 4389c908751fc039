//! Flowchart diagram engine: parsing, repair, mutation and analysis of the
//! mermaid-style flowchart text that is the single source of truth for a
//! process map.

pub mod graph;
pub mod metrics;
pub mod mutate;
pub mod parser;
pub mod repair;
pub mod structural;
pub mod syntax;
pub mod types;
pub mod writer;

pub use metrics::extract_metrics;
pub use mutate::{
    NewNode, NodeInsertion, add_connection, add_node, remove_connection, remove_node,
    set_connection_label, set_node_label, set_node_time_estimate,
};
pub use parser::parse;
pub use repair::{validate, validate_with};
pub use structural::diagnose;
pub use types::{Connection, DiagramModel, EdgeForm, Group, Node, NodeKind};
