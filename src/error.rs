//! Unified engine error type used across the diagram, document and metrics engines.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Parse,
    Mutate,
    Validate,
    Document,
    Config,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Mutate => write!(f, "Mutate"),
            Phase::Validate => write!(f, "Validate"),
            Phase::Document => write!(f, "Document"),
            Phase::Config => write!(f, "Config"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{phase}:{code}] {message}{}", node_suffix(.node_id))]
pub struct EngineError {
    pub code: String,
    pub phase: Phase,
    pub message: String,
    pub node_id: Option<String>,
}

fn node_suffix(node_id: &Option<String>) -> String {
    match node_id {
        Some(id) => format!(" (node '{}')", id),
        None => String::new(),
    }
}

impl EngineError {
    pub fn mutate(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        EngineError {
            code: code.into(),
            phase: Phase::Mutate,
            message: message.into(),
            node_id,
        }
    }

    pub fn validate(code: &str, message: impl Into<String>, node_id: Option<String>) -> Self {
        EngineError {
            code: code.into(),
            phase: Phase::Validate,
            message: message.into(),
            node_id,
        }
    }

    pub fn document(code: &str, message: impl Into<String>) -> Self {
        EngineError {
            code: code.into(),
            phase: Phase::Document,
            message: message.into(),
            node_id: None,
        }
    }

    pub fn config(code: &str, message: impl Into<String>) -> Self {
        EngineError {
            code: code.into(),
            phase: Phase::Config,
            message: message.into(),
            node_id: None,
        }
    }

    /// Shorthand for the most common mutator failure.
    pub fn unknown_node(node_id: &str) -> Self {
        EngineError::mutate(
            "M001",
            format!("Node '{}' does not exist in the diagram", node_id),
            Some(node_id.to_string()),
        )
    }
}
