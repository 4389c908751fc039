//! Element tree built from the token stream.
//!
//! Only what the document engine needs: element names, attributes, start and
//! end tag spans, and parent/child links. Omitted end tags are implied the way
//! browsers imply them for cells, rows, row groups, paragraphs and list items;
//! the implied end tag is an empty span at the position it was implied.

use std::ops::Range;

use super::lexer::{self, Token, TokenKind};

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose tags separate words in plain text.
const BREAKING_ELEMENTS: [&str; 12] = [
    "br", "p", "div", "li", "ul", "ol", "td", "th", "tr", "h1", "h2", "h3",
];

#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub open: Range<usize>,
    pub close: Range<usize>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

impl Element {
    /// Content between the start and end tags.
    pub fn inner(&self) -> Range<usize> {
        self.open.end..self.close.start.max(self.open.end)
    }

    /// The element including its tags.
    pub fn outer(&self) -> Range<usize> {
        self.open.start..self.close.end.max(self.open.end)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    /// In document order of their start tags.
    pub elements: Vec<Element>,
}

impl Tree {
    pub fn build(html: &str) -> Self {
        TreeBuilder::default().run(lexer::tokenize(html), html.len())
    }

    pub fn children_named<'t>(
        &'t self,
        idx: usize,
        names: &'t [&str],
    ) -> impl Iterator<Item = usize> + 't {
        self.elements[idx]
            .children
            .iter()
            .copied()
            .filter(move |&c| names.contains(&self.elements[c].name.as_str()))
    }

    pub fn ancestors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.elements[idx].parent, |&p| self.elements[p].parent)
    }

    pub fn has_ancestor(&self, idx: usize, names: &[&str]) -> bool {
        self.ancestors(idx)
            .any(|a| names.contains(&self.elements[a].name.as_str()))
    }
}

#[derive(Default)]
struct TreeBuilder {
    elements: Vec<Element>,
    stack: Vec<usize>,
}

impl TreeBuilder {
    fn run(mut self, tokens: Vec<Token>, len: usize) -> Tree {
        for token in tokens {
            match token.kind {
                TokenKind::StartTag {
                    name,
                    attrs,
                    self_closing,
                } => self.start(name, attrs, self_closing, token.span),
                TokenKind::EndTag { name } => self.end(&name, token.span),
                _ => {}
            }
        }
        while !self.stack.is_empty() {
            self.pop(len..len);
        }
        Tree {
            elements: self.elements,
        }
    }

    fn current_name(&self) -> Option<&str> {
        self.stack.last().map(|&i| self.elements[i].name.as_str())
    }

    fn pop(&mut self, close: Range<usize>) {
        if let Some(idx) = self.stack.pop() {
            self.elements[idx].close = close;
        }
    }

    /// Close open elements named in `names`, stopping at any of `boundary`.
    fn close_implied(&mut self, names: &[&str], boundary: &[&str], at: usize) {
        let Some(pos) = self.stack.iter().rposition(|&i| {
            let name = self.elements[i].name.as_str();
            names.contains(&name) || boundary.contains(&name)
        }) else {
            return;
        };
        if names.contains(&self.elements[self.stack[pos]].name.as_str()) {
            while self.stack.len() > pos {
                self.pop(at..at);
            }
        }
    }

    fn start(
        &mut self,
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
        span: Range<usize>,
    ) {
        let at = span.start;
        match name.as_str() {
            "td" | "th" => self.close_implied(&["td", "th"], &["tr", "table"], at),
            "tr" => self.close_implied(&["tr"], &["table", "thead", "tbody", "tfoot"], at),
            "thead" | "tbody" | "tfoot" => {
                self.close_implied(&["thead", "tbody", "tfoot"], &["table"], at)
            }
            "li" => self.close_implied(&["li"], &["ul", "ol"], at),
            "p" | "ul" | "ol" | "table" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if self.current_name() == Some("p") {
                    self.pop(at..at);
                }
            }
            _ => {}
        }

        let idx = self.elements.len();
        let parent = self.stack.last().copied();
        let void = self_closing || VOID_ELEMENTS.contains(&name.as_str());
        self.elements.push(Element {
            name,
            attrs,
            close: span.end..span.end,
            open: span,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.elements[p].children.push(idx);
        }
        if !void {
            self.stack.push(idx);
        }
    }

    /// An end tag closes the innermost open element of that name and
    /// everything opened inside it. An end tag with no open match is ignored.
    fn end(&mut self, name: &str, span: Range<usize>) {
        let Some(pos) = self
            .stack
            .iter()
            .rposition(|&i| self.elements[i].name == name)
        else {
            return;
        };
        while self.stack.len() > pos + 1 {
            self.pop(span.start..span.start);
        }
        self.pop(span);
    }
}

/// Plain text of a markup fragment: tags dropped, entities decoded,
/// whitespace collapsed.
pub fn plain_text(fragment: &str) -> String {
    let mut text = String::new();
    for token in lexer::tokenize(fragment) {
        match token.kind {
            TokenKind::Text => text.push_str(&fragment[token.span]),
            TokenKind::StartTag { name, .. } | TokenKind::EndTag { name }
                if BREAKING_ELEMENTS.contains(&name.as_str()) =>
            {
                text.push(' ')
            }
            _ => {}
        }
    }
    lexer::decode(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tree: &Tree, idxs: impl Iterator<Item = usize>) -> Vec<String> {
        idxs.map(|i| tree.elements[i].name.clone()).collect()
    }

    #[test]
    fn implied_cell_and_row_ends() {
        let html = "<table><tr><td>a<td>b<tr><td>c</table>";
        let tree = Tree::build(html);
        let table = 0;
        assert_eq!(names(&tree, tree.children_named(table, &["tr"])), vec!["tr", "tr"]);
        let first_row = tree.elements[table].children[0];
        let cells: Vec<usize> = tree.children_named(first_row, &["td"]).collect();
        assert_eq!(cells.len(), 2);
        assert_eq!(&html[tree.elements[cells[0]].inner()], "a");
        assert_eq!(&html[tree.elements[cells[1]].inner()], "b");
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        let tree = Tree::build("<p>x</div></p>");
        assert_eq!(tree.elements.len(), 1);
        assert_eq!(tree.elements[0].close, 10..14);
    }

    #[test]
    fn void_elements_have_no_children() {
        let tree = Tree::build("<p>a<br>b</p>");
        assert_eq!(tree.elements[1].name, "br");
        assert_eq!(tree.elements[1].parent, Some(0));
        assert!(tree.elements[0].children == vec![1]);
    }

    #[test]
    fn plain_text_strips_tags_and_decodes() {
        assert_eq!(plain_text("<b>Fish</b> &amp;\n  chips<br>today"), "Fish & chips today");
    }
}
