//! WASM entry points for browser use.
//!
//! Each entry point wraps a library call and serializes a DTO to a JS value.
//! Mutations return `{"status":"success", …}` or `{"status":"errors","errors":[…]}`.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::diagram::{self, NewNode};
use crate::document::{self, CellAddress, RowPosition, TextAddress, TextKind};
use crate::error::{EngineError, Phase};
use crate::metrics::{self, ProcessMetrics};

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// Diagram
// ---------------------------------------------------------------------------

/// Parse a flowchart source. Returns the `DiagramModel`.
#[wasm_bindgen]
pub fn parse_diagram(source: &str) -> JsValue {
    to_js(&diagram::parse(source))
}

/// Repair a flowchart source with the default configuration.
#[wasm_bindgen]
pub fn validate_diagram(source: &str) -> String {
    diagram::validate(source)
}

/// Repair a flowchart source with a JSON engine config.
#[wasm_bindgen]
pub fn validate_diagram_with_config(source: &str, config_json: &str) -> JsValue {
    to_js(&validate_with_config_inner(source, config_json))
}

fn validate_with_config_inner(source: &str, config_json: &str) -> EditResult {
    EngineConfig::from_json(config_json)
        .map(|config| diagram::validate_with(source, &config))
        .into()
}

/// Structural diagnostics. Returns a JSON array of error objects.
#[wasm_bindgen]
pub fn diagnose_diagram(source: &str) -> JsValue {
    let errors: Vec<ErrorDto> = diagram::diagnose(source)
        .into_iter()
        .map(ErrorDto::from)
        .collect();
    to_js(&errors)
}

#[wasm_bindgen]
pub fn set_node_time_estimate(source: &str, node_id: &str, estimate: &str) -> JsValue {
    to_js(&EditResult::from(diagram::set_node_time_estimate(
        source, node_id, estimate,
    )))
}

#[wasm_bindgen]
pub fn set_node_label(source: &str, node_id: &str, label: &str) -> JsValue {
    to_js(&EditResult::from(diagram::set_node_label(source, node_id, label)))
}

#[wasm_bindgen]
pub fn set_connection_label(source: &str, from_id: &str, to_id: &str, label: &str) -> JsValue {
    to_js(&EditResult::from(diagram::set_connection_label(
        source, from_id, to_id, label,
    )))
}

/// Add a node described by a JSON object
/// (`{"label", "kind"?, "id"?, "timeEstimate"?, "connectFrom"?, "connectTo"?, "connectionLabel"?}`).
#[wasm_bindgen]
pub fn add_node(source: &str, node_json: &str) -> JsValue {
    to_js(&add_node_inner(source, node_json))
}

fn add_node_inner(source: &str, node_json: &str) -> NodeResult {
    let new_node = match serde_json::from_str::<NewNode>(node_json) {
        Ok(n) => n,
        Err(e) => {
            return NodeResult::Errors {
                errors: vec![parse_error("node JSON", e)],
            };
        }
    };
    match diagram::add_node(source, &new_node) {
        Ok(insertion) => NodeResult::Success {
            source: insertion.source,
            node_id: insertion.node_id,
        },
        Err(e) => NodeResult::Errors {
            errors: vec![e.into()],
        },
    }
}

#[wasm_bindgen]
pub fn remove_node(source: &str, node_id: &str) -> JsValue {
    to_js(&EditResult::from(diagram::remove_node(source, node_id)))
}

#[wasm_bindgen]
pub fn add_connection(source: &str, from_id: &str, to_id: &str, label: Option<String>) -> JsValue {
    to_js(&EditResult::from(diagram::add_connection(
        source,
        from_id,
        to_id,
        label.as_deref(),
    )))
}

#[wasm_bindgen]
pub fn remove_connection(source: &str, from_id: &str, to_id: &str) -> JsValue {
    to_js(&EditResult::from(diagram::remove_connection(
        source, from_id, to_id,
    )))
}

/// `timestamp` is stamped onto the result as given; the engine never reads a clock.
#[wasm_bindgen]
pub fn extract_diagram_metrics(source: &str, timestamp: Option<String>) -> JsValue {
    to_js(&stamped(diagram::extract_metrics(source), timestamp))
}

fn stamped(metrics: ProcessMetrics, timestamp: Option<String>) -> ProcessMetrics {
    match timestamp {
        Some(ts) => metrics.with_timestamp(ts),
        None => metrics,
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[wasm_bindgen]
pub fn parse_document(html: &str) -> JsValue {
    to_js(&document::parse_document(html))
}

#[wasm_bindgen]
pub fn set_document_cell(
    html: &str,
    section_index: usize,
    row_index: usize,
    cell_index: usize,
    markup: &str,
) -> JsValue {
    let address = CellAddress {
        section_index,
        row_index,
        cell_index,
    };
    to_js(&EditResult::from(document::set_cell(html, address, markup)))
}

/// `text_type` is `"paragraph"` or `"list"`.
#[wasm_bindgen]
pub fn set_document_text(
    html: &str,
    text_type: &str,
    index: usize,
    item_index: Option<usize>,
    markup: &str,
) -> JsValue {
    let result = text_type.parse::<TextKind>().and_then(|text_type| {
        let address = TextAddress {
            text_type,
            index,
            item_index,
        };
        document::set_text(html, address, markup)
    });
    to_js(&EditResult::from(result))
}

/// `position` is `"prepend"`, `"append"` or a row index; `cells_json` is a
/// JSON array of cell markup strings.
#[wasm_bindgen]
pub fn insert_document_row(html: &str, section_index: usize, position: &str, cells_json: &str) -> JsValue {
    to_js(&insert_row_inner(html, section_index, position, cells_json))
}

fn insert_row_inner(html: &str, section_index: usize, position: &str, cells_json: &str) -> EditResult {
    let cells = match serde_json::from_str::<Vec<String>>(cells_json) {
        Ok(c) => c,
        Err(e) => {
            return EditResult::Errors {
                errors: vec![parse_error("row cells JSON", e)],
            };
        }
    };
    let position = match position.trim().to_ascii_lowercase().as_str() {
        "prepend" => RowPosition::Prepend,
        "append" => RowPosition::Append,
        other => match other.parse::<usize>() {
            Ok(n) => RowPosition::At(n),
            Err(_) => {
                return EngineError::document(
                    "D007",
                    format!("Invalid insert position '{}': expected prepend, append or an index", other),
                )
                .into();
            }
        },
    };
    document::insert_row(html, section_index, position, &cells).into()
}

#[wasm_bindgen]
pub fn delete_document_row(html: &str, section_index: usize, row_index: usize) -> JsValue {
    to_js(&EditResult::from(document::delete_row(
        html,
        section_index,
        row_index,
    )))
}

#[wasm_bindgen]
pub fn extract_document_metrics(html: &str, timestamp: Option<String>) -> JsValue {
    to_js(&stamped(document::extract_document_metrics(html), timestamp))
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Merge two `ProcessMetrics` JSON objects. Unreadable input yields the
/// error-sourced metrics.
#[wasm_bindgen]
pub fn merge_metrics(workflow_json: &str, document_json: &str) -> JsValue {
    to_js(&merge_metrics_inner(workflow_json, document_json))
}

fn merge_metrics_inner(workflow_json: &str, document_json: &str) -> ProcessMetrics {
    let workflow = serde_json::from_str::<ProcessMetrics>(workflow_json);
    let document = serde_json::from_str::<ProcessMetrics>(document_json);
    match (workflow, document) {
        (Ok(workflow), Ok(document)) => metrics::merge_metrics(&workflow, &document),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("cannot merge metrics: {}", e);
            ProcessMetrics::error()
        }
    }
}

#[wasm_bindgen]
pub fn calculate_time_savings(original_json: Option<String>, optimized_json: Option<String>) -> JsValue {
    let read = |json: Option<String>| {
        json.and_then(|j| serde_json::from_str::<ProcessMetrics>(&j).ok())
    };
    let original = read(original_json);
    let optimized = read(optimized_json);
    to_js(&metrics::calculate_time_savings(
        original.as_ref(),
        optimized.as_ref(),
    ))
}

#[wasm_bindgen]
pub fn parse_time_to_minutes(text: &str) -> Option<u32> {
    metrics::parse_time_to_minutes(text)
}

#[wasm_bindgen]
pub fn format_minutes_to_time(minutes: u32) -> String {
    metrics::format_minutes_to_time(minutes)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
    node_id: Option<String>,
}

impl From<EngineError> for ErrorDto {
    fn from(e: EngineError) -> Self {
        ErrorDto {
            code: e.code,
            phase: e.phase.to_string(),
            message: e.message,
            node_id: e.node_id,
        }
    }
}

fn parse_error(what: &str, e: serde_json::Error) -> ErrorDto {
    ErrorDto {
        code: "P001".into(),
        phase: Phase::Parse.to_string(),
        message: format!("Failed to parse {}: {}", what, e),
        node_id: None,
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status")]
enum EditResult {
    #[serde(rename = "success")]
    Success { source: String },
    #[serde(rename = "errors")]
    Errors { errors: Vec<ErrorDto> },
}

impl From<Result<String, EngineError>> for EditResult {
    fn from(result: Result<String, EngineError>) -> Self {
        match result {
            Ok(source) => EditResult::Success { source },
            Err(e) => e.into(),
        }
    }
}

impl From<EngineError> for EditResult {
    fn from(e: EngineError) -> Self {
        EditResult::Errors {
            errors: vec![e.into()],
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status")]
enum NodeResult {
    #[serde(rename = "success")]
    Success {
        source: String,
        #[serde(rename = "nodeId")]
        node_id: String,
    },
    #[serde(rename = "errors")]
    Errors { errors: Vec<ErrorDto> },
}
