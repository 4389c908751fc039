//! HTML process-document engine: sections (tables), rows, cells and loose
//! text blocks, with coordinate-checked single-splice edits.

pub mod lexer;
pub mod metrics;
pub mod mutate;
pub mod parser;
pub mod tree;
pub mod types;

pub use metrics::extract_document_metrics;
pub use mutate::{CellAddress, RowPosition, TextAddress, delete_row, insert_row, set_cell, set_text};
pub use parser::{parse_document, parse_document_with};
pub use types::{Cell, DocumentModel, ListItem, Row, Section, TextBlock, TextKind};
