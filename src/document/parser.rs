//! Document parser: HTML → `DocumentModel`.
//!
//! Every outermost table is a section; tables nested inside a cell stay part of
//! that cell's markup. Never fails: markup the tree builder cannot make sense
//! of simply contributes no sections.

use log::debug;

use super::tree::{Tree, plain_text};
use super::types::*;
use crate::config::DocumentConfig;

const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];
const ROW_GROUPS: [&str; 3] = ["thead", "tbody", "tfoot"];

pub fn parse_document(html: &str) -> DocumentModel {
    parse_document_with(html, &DocumentConfig::default())
}

pub fn parse_document_with(html: &str, config: &DocumentConfig) -> DocumentModel {
    let tree = Tree::build(html);
    let elements = &tree.elements;

    let all_tables: Vec<usize> = (0..elements.len())
        .filter(|&i| elements[i].name == "table")
        .collect();
    let headings: Vec<usize> = (0..elements.len())
        .filter(|&i| HEADINGS.contains(&elements[i].name.as_str()))
        .filter(|&i| !tree.has_ancestor(i, &["table"]))
        .collect();

    let mut sections = Vec::new();
    let mut previous_table_end = 0;
    for (table_index, &table) in all_tables.iter().enumerate() {
        if tree.has_ancestor(table, &["table"]) {
            continue;
        }
        let element = &elements[table];

        let mut rows: Vec<Row> = table_rows(&tree, table)
            .into_iter()
            .enumerate()
            .map(|(position, row)| build_row(html, &tree, row, position))
            .collect();

        let caption = tree
            .children_named(table, &["caption"])
            .next()
            .map(|c| plain_text(&html[elements[c].inner()]))
            .filter(|t| !t.is_empty());
        let heading = headings
            .iter()
            .rev()
            .find(|&&h| {
                elements[h].open.start >= previous_table_end
                    && elements[h].outer().end <= element.open.start
            })
            .map(|&h| plain_text(&html[elements[h].inner()]))
            .filter(|t| !t.is_empty());
        let spanning = if is_title_row(&rows) {
            debug!("table {} opens with a spanning title row", table_index);
            Some(rows.remove(0).cells[0].plain_text.clone()).filter(|t| !t.is_empty())
        } else {
            None
        };

        let title = caption.or(heading).or(spanning).unwrap_or_else(|| {
            format!("{} {}", config.section_title_prefix, sections.len() + 1)
        });

        let body = tree.children_named(table, &["tbody"]).last();
        let empty_insert_at = match body {
            Some(b) => elements[b].inner().end,
            None => element.inner().end,
        };

        sections.push(Section {
            title,
            table_index,
            rows,
            empty_insert_at,
        });
        previous_table_end = element.outer().end;
    }

    DocumentModel {
        sections,
        text_blocks: text_blocks(html, &tree),
    }
}

/// Rows of a table in document order, through any row groups.
fn table_rows(tree: &Tree, table: usize) -> Vec<usize> {
    let mut rows = Vec::new();
    for &child in &tree.elements[table].children {
        match tree.elements[child].name.as_str() {
            "tr" => rows.push(child),
            name if ROW_GROUPS.contains(&name) => rows.extend(tree.children_named(child, &["tr"])),
            _ => {}
        }
    }
    rows
}

fn build_row(html: &str, tree: &Tree, row: usize, position: usize) -> Row {
    let cells = tree
        .children_named(row, &["td", "th"])
        .map(|c| {
            let element = &tree.elements[c];
            let inner = element.inner();
            Cell {
                inner_markup: html[inner.clone()].to_string(),
                plain_text: plain_text(&html[inner.clone()]),
                is_header_cell: element.name == "th",
                col_span: span_attr(element.attr("colspan")),
                row_span: span_attr(element.attr("rowspan")),
                inner_span: inner,
            }
        })
        .collect();
    Row {
        cells,
        row_index_in_table: position,
        span: tree.elements[row].outer(),
    }
}

fn span_attr(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

/// A first row holding one cell that spans every column of the rows below.
fn is_title_row(rows: &[Row]) -> bool {
    let Some((first, rest)) = rows.split_first() else {
        return false;
    };
    if first.cells.len() != 1 || rest.is_empty() {
        return false;
    }
    let widest = rest
        .iter()
        .map(|r| r.cells.iter().map(|c| c.col_span).sum::<u32>())
        .max()
        .unwrap_or(0);
    let span = first.cells[0].col_span;
    span > 1 && span >= widest
}

fn text_blocks(html: &str, tree: &Tree) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for (idx, element) in tree.elements.iter().enumerate() {
        let kind = match element.name.as_str() {
            "p" => TextKind::Paragraph,
            "ul" | "ol" => TextKind::List,
            _ => continue,
        };
        if tree.has_ancestor(idx, &["table", "p", "ul", "ol", "li"]) {
            continue;
        }

        let inner = element.inner();
        let items = tree
            .children_named(idx, &["li"])
            .map(|li| {
                let span = tree.elements[li].inner();
                ListItem {
                    inner_markup: html[span.clone()].to_string(),
                    plain_text: plain_text(&html[span.clone()]),
                    inner_span: span,
                }
            })
            .collect();
        blocks.push(TextBlock {
            kind,
            ordered: element.name == "ol",
            inner_markup: html[inner.clone()].to_string(),
            plain_text: plain_text(&html[inner.clone()]),
            items,
            inner_span: inner,
        });
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_no_sections() {
        assert!(parse_document("").is_empty());
        assert!(parse_document("<div>no tables</div>").is_empty());
    }

    #[test]
    fn title_falls_back_through_caption_heading_row_and_position() {
        let html = concat!(
            "<table><caption>Intake</caption><tr><td>a</td></tr></table>",
            "<h2>Review</h2><table><tr><td>b</td></tr></table>",
            "<table><tr><td colspan=\"2\">Approval</td></tr><tr><td>c</td><td>d</td></tr></table>",
            "<table><tr><td>e</td></tr></table>",
        );
        let doc = parse_document(html);
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Intake", "Review", "Approval", "Section 4"]);
        assert_eq!(doc.sections[2].rows.len(), 1);
        assert_eq!(doc.sections[2].rows[0].row_index_in_table, 1);
    }

    #[test]
    fn nested_tables_stay_in_their_cell() {
        let html = "<table><tr><td><table><tr><td>x</td></tr></table></td></tr></table><table></table>";
        let doc = parse_document(html);
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[1].table_index, 2);
        assert!(doc.sections[0].rows[0].cells[0].inner_markup.starts_with("<table>"));
    }

    #[test]
    fn cells_keep_markup_and_plain_text() {
        let html = "<table><tr><th rowspan=\"2\">Step</th><td><b>Fill</b> &amp; sign</td></tr></table>";
        let cells = &parse_document(html).sections[0].rows[0].cells;
        assert!(cells[0].is_header_cell);
        assert_eq!(cells[0].row_span, 2);
        assert_eq!(cells[1].inner_markup, "<b>Fill</b> &amp; sign");
        assert_eq!(cells[1].plain_text, "Fill & sign");
    }

    #[test]
    fn collects_top_level_text_blocks() {
        let html = "<p>Intro</p><ol><li>One<li>Two</ol><table><tr><td><p>inside</p></td></tr></table>";
        let doc = parse_document(html);
        assert_eq!(doc.text_blocks.len(), 2);
        assert_eq!(doc.text_blocks[0].plain_text, "Intro");
        let list = &doc.text_blocks[1];
        assert!(list.ordered);
        let items: Vec<&str> = list.items.iter().map(|i| i.plain_text.as_str()).collect();
        assert_eq!(items, vec!["One", "Two"]);
    }
}
