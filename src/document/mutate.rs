//! Document mutator.
//!
//! Each operation re-parses the document, validates every coordinate, splices
//! exactly one change into the original string and returns the result. Bytes
//! outside the splice are untouched. A bad coordinate fails before any edit.

use std::ops::Range;

use log::debug;
use serde::{Deserialize, Serialize};

use super::parser::parse_document;
use super::types::{DocumentModel, Row, Section, TextKind};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellAddress {
    pub section_index: usize,
    pub row_index: usize,
    pub cell_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAddress {
    pub text_type: TextKind,
    pub index: usize,
    /// Targets one item of a list; `None` replaces the whole block.
    #[serde(default)]
    pub item_index: Option<usize>,
}

/// Where `insert_row` places the new row among the section's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "index")]
pub enum RowPosition {
    Prepend,
    Append,
    At(usize),
}

/// Replace the inner markup of one cell.
pub fn set_cell(html: &str, address: CellAddress, markup: &str) -> Result<String, EngineError> {
    let doc = parse_document(html);
    let section = section(&doc, address.section_index)?;
    let row = row(section, address.section_index, address.row_index)?;
    let cell = row.cells.get(address.cell_index).ok_or_else(|| {
        EngineError::document(
            "D003",
            format!(
                "Invalid cell index {} in row {} of section {}: the row has {} cells",
                address.cell_index,
                address.row_index,
                address.section_index,
                row.cells.len()
            ),
        )
    })?;
    Ok(splice(html, cell.inner_span.clone(), markup))
}

/// Replace the inner markup of a paragraph, a list, or one list item.
pub fn set_text(html: &str, address: TextAddress, markup: &str) -> Result<String, EngineError> {
    let doc = parse_document(html);
    let blocks: Vec<_> = doc.text_blocks_of(address.text_type).collect();
    let block = blocks.get(address.index).ok_or_else(|| {
        EngineError::document(
            "D005",
            format!(
                "Invalid {} index {}: the document has {}",
                address.text_type.as_str(),
                address.index,
                blocks.len()
            ),
        )
    })?;

    let target = match (address.text_type, address.item_index) {
        (TextKind::List, Some(item)) => block
            .items
            .get(item)
            .map(|i| i.inner_span.clone())
            .ok_or_else(|| {
                EngineError::document(
                    "D006",
                    format!(
                        "Invalid list item index {} in list {}: the list has {} items",
                        item,
                        address.index,
                        block.items.len()
                    ),
                )
            })?,
        _ => block.inner_span.clone(),
    };
    Ok(splice(html, target, markup))
}

/// Insert a row built from one markup fragment per column.
pub fn insert_row(
    html: &str,
    section_index: usize,
    position: RowPosition,
    cells: &[String],
) -> Result<String, EngineError> {
    if cells.is_empty() {
        return Err(EngineError::document(
            "D008",
            "A new row needs at least one cell",
        ));
    }
    let doc = parse_document(html);
    let section = section(&doc, section_index)?;
    let count = section.rows.len();
    let at = match position {
        RowPosition::Prepend => 0,
        RowPosition::Append => count,
        RowPosition::At(n) if n <= count => n,
        RowPosition::At(n) => {
            return Err(EngineError::document(
                "D007",
                format!(
                    "Invalid insert position {} in section {}: the section has {} rows",
                    n, section_index, count
                ),
            ));
        }
    };

    // One fragment per column, counted on the widest existing row. An empty
    // section accepts any width.
    let columns = section
        .rows
        .iter()
        .map(|r| r.cells.iter().map(|c| c.col_span as usize).sum::<usize>())
        .max();
    if let Some(columns) = columns.filter(|&n| n != cells.len()) {
        return Err(EngineError::document(
            "D009",
            format!(
                "Row has {} cells but section {} has {} columns",
                cells.len(),
                section_index,
                columns
            ),
        ));
    }

    let row_markup = format!(
        "<tr>{}</tr>",
        cells
            .iter()
            .map(|c| format!("<td>{}</td>", c))
            .collect::<String>()
    );
    debug!("inserting row {} into section {}", at, section_index);

    let edited = match section.rows.get(at) {
        // Before an existing row, on its own line when that row has one.
        Some(next) => {
            let line = line_extent(html, next.span.clone());
            if line.start < next.span.start {
                let indent = &html[line.start..next.span.start];
                insert(html, line.start, &format!("{}{}\n", indent, row_markup))
            } else {
                insert(html, next.span.start, &row_markup)
            }
        }
        // After the last row.
        None => match section.rows.last() {
            Some(last) => {
                let line = line_extent(html, last.span.clone());
                if line.start < last.span.start {
                    let indent = &html[line.start..last.span.start];
                    insert(html, last.span.end, &format!("\n{}{}", indent, row_markup))
                } else {
                    insert(html, last.span.end, &row_markup)
                }
            }
            None => insert(html, section.empty_insert_at, &row_markup),
        },
    };
    Ok(edited)
}

/// Delete one row. A row alone on its line takes the line with it.
pub fn delete_row(html: &str, section_index: usize, row_index: usize) -> Result<String, EngineError> {
    let doc = parse_document(html);
    let section = section(&doc, section_index)?;
    let row = row(section, section_index, row_index)?;
    Ok(splice(html, line_extent(html, row.span.clone()), ""))
}

fn section(doc: &DocumentModel, index: usize) -> Result<&Section, EngineError> {
    doc.sections.get(index).ok_or_else(|| {
        EngineError::document(
            "D001",
            format!(
                "Invalid section index {}: the document has {} sections",
                index,
                doc.sections.len()
            ),
        )
    })
}

fn row(section: &Section, section_index: usize, index: usize) -> Result<&Row, EngineError> {
    section.rows.get(index).ok_or_else(|| {
        EngineError::document(
            "D002",
            format!(
                "Invalid row index {} in section {}: the section has {} rows",
                index,
                section_index,
                section.rows.len()
            ),
        )
    })
}

fn splice(html: &str, range: Range<usize>, text: &str) -> String {
    let mut out = String::with_capacity(html.len() + text.len());
    out.push_str(&html[..range.start]);
    out.push_str(text);
    out.push_str(&html[range.end..]);
    out
}

fn insert(html: &str, at: usize, text: &str) -> String {
    splice(html, at..at, text)
}

/// Widen `range` to whole lines when only whitespace shares its lines;
/// otherwise return it unchanged.
fn line_extent(html: &str, range: Range<usize>) -> Range<usize> {
    let line_start = html[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = html[range.end..]
        .find('\n')
        .map_or(html.len(), |i| range.end + i + 1);
    let alone = html[line_start..range.start].trim().is_empty()
        && html[range.end..line_end].trim().is_empty();
    if alone { line_start..line_end } else { range }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<table>\n  <tr><td>a</td><td>b</td></tr>\n  <tr><td>c</td><td>d</td></tr>\n</table>";

    #[test]
    fn set_cell_touches_only_the_cell() {
        let address = CellAddress {
            section_index: 0,
            row_index: 1,
            cell_index: 0,
        };
        let out = set_cell(DOC, address, "<i>C</i>").unwrap();
        assert_eq!(out, DOC.replace("<td>c</td>", "<td><i>C</i></td>"));
    }

    #[test]
    fn bad_coordinates_name_the_index() {
        let cell = |section_index, row_index, cell_index| CellAddress {
            section_index,
            row_index,
            cell_index,
        };
        let err = set_cell(DOC, cell(99, 0, 0), "x").unwrap_err();
        assert_eq!(err.code, "D001");
        assert!(err.message.contains("99"));
        assert_eq!(set_cell(DOC, cell(0, 2, 0), "x").unwrap_err().code, "D002");
        assert_eq!(set_cell(DOC, cell(0, 0, 2), "x").unwrap_err().code, "D003");
    }

    #[test]
    fn rows_are_inserted_on_their_own_line() {
        let cells = vec!["x".to_string(), "y".to_string()];
        let out = insert_row(DOC, 0, RowPosition::Prepend, &cells).unwrap();
        assert!(out.starts_with("<table>\n  <tr><td>x</td><td>y</td></tr>\n  <tr><td>a</td>"));

        let out = insert_row(DOC, 0, RowPosition::Append, &cells).unwrap();
        assert!(out.ends_with("<td>d</td></tr>\n  <tr><td>x</td><td>y</td></tr>\n</table>"));

        let out = insert_row(DOC, 0, RowPosition::At(1), &cells).unwrap();
        assert_eq!(parse_document(&out).sections[0].rows[1].cells[0].plain_text, "x");
    }

    #[test]
    fn insert_validates_position_and_cells() {
        let cells = vec!["x".to_string()];
        assert_eq!(
            insert_row(DOC, 0, RowPosition::At(3), &cells).unwrap_err().code,
            "D007"
        );
        assert_eq!(
            insert_row(DOC, 0, RowPosition::Append, &[]).unwrap_err().code,
            "D008"
        );
        let err = insert_row(DOC, 0, RowPosition::Append, &cells).unwrap_err();
        assert_eq!(err.code, "D009");
        assert!(err.message.contains("has 2 columns"));
    }

    #[test]
    fn insert_into_empty_table() {
        let out = insert_row("<table><tbody></tbody></table>", 0, RowPosition::Append, &["z".into()]).unwrap();
        assert_eq!(out, "<table><tbody><tr><td>z</td></tr></tbody></table>");
    }

    #[test]
    fn delete_row_removes_its_line() {
        let out = delete_row(DOC, 0, 0).unwrap();
        assert_eq!(out, "<table>\n  <tr><td>c</td><td>d</td></tr>\n</table>");
    }

    #[test]
    fn set_text_targets_blocks_and_items() {
        let html = "<p>Intro</p><ul><li>One</li><li>Two</li></ul>";
        let list_item = TextAddress {
            text_type: TextKind::List,
            index: 0,
            item_index: Some(1),
        };
        assert_eq!(
            set_text(html, list_item, "2").unwrap(),
            "<p>Intro</p><ul><li>One</li><li>2</li></ul>"
        );

        let paragraph = TextAddress {
            text_type: TextKind::Paragraph,
            index: 0,
            item_index: None,
        };
        assert_eq!(
            set_text(html, paragraph, "Hello").unwrap(),
            "<p>Hello</p><ul><li>One</li><li>Two</li></ul>"
        );

        let missing = TextAddress {
            index: 3,
            ..paragraph
        };
        assert_eq!(set_text(html, missing, "x").unwrap_err().code, "D005");
        let bad_item = TextAddress {
            item_index: Some(5),
            ..list_item
        };
        assert_eq!(set_text(html, bad_item, "x").unwrap_err().code, "D006");
    }
}
