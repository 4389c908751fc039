//! Structural model of an HTML process document.

use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub inner_markup: String,
    pub plain_text: String,
    pub is_header_cell: bool,
    pub col_span: u32,
    pub row_span: u32,
    #[serde(skip)]
    pub(crate) inner_span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Position among all rows of the table, a skipped title row included.
    pub row_index_in_table: usize,
    #[serde(skip)]
    pub(crate) span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,
    /// Position among all tables of the document, nested ones included.
    pub table_index: usize,
    pub rows: Vec<Row>,
    /// Where a row goes when the section has none: before this offset.
    #[serde(skip)]
    pub(crate) empty_insert_at: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextKind {
    Paragraph,
    List,
}

impl TextKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextKind::Paragraph => "paragraph",
            TextKind::List => "list",
        }
    }
}

impl FromStr for TextKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paragraph" | "p" => Ok(TextKind::Paragraph),
            "list" | "ul" | "ol" => Ok(TextKind::List),
            other => Err(EngineError::document(
                "D004",
                format!("Invalid text type '{}': expected 'paragraph' or 'list'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub inner_markup: String,
    pub plain_text: String,
    #[serde(skip)]
    pub(crate) inner_span: Range<usize>,
}

/// A paragraph or list outside every table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub kind: TextKind,
    pub ordered: bool,
    pub inner_markup: String,
    pub plain_text: String,
    /// List items; empty for paragraphs.
    pub items: Vec<ListItem>,
    #[serde(skip)]
    pub(crate) inner_span: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    pub sections: Vec<Section>,
    pub text_blocks: Vec<TextBlock>,
}

impl DocumentModel {
    /// Text blocks of one kind, in document order.
    pub fn text_blocks_of(&self, kind: TextKind) -> impl Iterator<Item = &TextBlock> {
        self.text_blocks.iter().filter(move |b| b.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.text_blocks.is_empty()
    }
}
