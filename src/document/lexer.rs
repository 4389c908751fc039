//! Lenient HTML tokenizer.
//!
//! Produces start tags (with attributes), end tags, text, comments and
//! doctypes, each carrying its byte span in the input. Nothing is rejected: a
//! `<` that does not open a tag is text, and a tag left open at end of input
//! runs to the end. `script` and `style` contents are read as raw text.

use std::ops::Range;

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text,
    Comment,
    Doctype,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

pub fn tokenize(html: &str) -> Vec<Token> {
    Lexer::new(html).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    text_start: Option<usize>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            text_start: None,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] != b'<' {
                self.text_start.get_or_insert(self.pos);
                self.pos += 1;
                continue;
            }
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.doctype();
            } else if rest.starts_with("</") && self.peek_is_alpha(2) {
                self.end_tag();
            } else if self.peek_is_alpha(1) {
                self.start_tag();
            } else {
                self.text_start.get_or_insert(self.pos);
                self.pos += 1;
            }
        }
        self.flush_text(self.bytes.len());
        self.tokens
    }

    fn peek_is_alpha(&self, offset: usize) -> bool {
        self.bytes
            .get(self.pos + offset)
            .is_some_and(|b| b.is_ascii_alphabetic())
    }

    fn flush_text(&mut self, end: usize) {
        if let Some(start) = self.text_start.take() {
            if start < end {
                self.push(TokenKind::Text, start..end);
            }
        }
    }

    fn push(&mut self, kind: TokenKind, span: Range<usize>) {
        self.tokens.push(Token { kind, span });
    }

    /// Byte offset just past the next occurrence of `needle` at or after
    /// `from`, or the end of input.
    fn past(&self, from: usize, needle: &str) -> usize {
        match self.src[from..].find(needle) {
            Some(rel) => from + rel + needle.len(),
            None => self.bytes.len(),
        }
    }

    fn comment(&mut self) {
        self.flush_text(self.pos);
        let start = self.pos;
        self.pos = self.past(start + 4, "-->");
        self.push(TokenKind::Comment, start..self.pos);
    }

    fn doctype(&mut self) {
        self.flush_text(self.pos);
        let start = self.pos;
        self.pos = self.past(start + 2, ">");
        self.push(TokenKind::Doctype, start..self.pos);
    }

    fn name_at(&self, from: usize) -> (String, usize) {
        let len = self.bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b':')
            .count();
        (self.src[from..from + len].to_ascii_lowercase(), from + len)
    }

    fn end_tag(&mut self) {
        self.flush_text(self.pos);
        let start = self.pos;
        let (name, after) = self.name_at(start + 2);
        self.pos = self.past(after, ">");
        self.push(TokenKind::EndTag { name }, start..self.pos);
    }

    fn start_tag(&mut self) {
        self.flush_text(self.pos);
        let start = self.pos;
        let (name, mut i) = self.name_at(start + 1);
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            i = self.skip_ws(i);
            match self.bytes.get(i) {
                None => break,
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') => {
                    if self.bytes.get(i + 1) == Some(&b'>') {
                        self_closing = true;
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                Some(_) => {
                    let (attr, next) = self.attribute(i);
                    attrs.push(attr);
                    i = next;
                }
            }
        }

        self.pos = i;
        let raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str()) && !self_closing;
        self.push(
            TokenKind::StartTag {
                name: name.clone(),
                attrs,
                self_closing,
            },
            start..self.pos,
        );
        if raw_text {
            self.raw_text(&name);
        }
    }

    fn skip_ws(&self, mut i: usize) -> usize {
        while self.bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
            i += 1;
        }
        i
    }

    /// One `name`, `name=value`, `name="value"` or `name='value'` attribute.
    fn attribute(&self, from: usize) -> ((String, String), usize) {
        let mut i = from;
        while let Some(&b) = self.bytes.get(i) {
            if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/') {
                break;
            }
            i += 1;
        }
        // A stray `=` or quote with no name still has to make progress.
        if i == from {
            i += 1;
        }
        let name = self.src[from..i].to_ascii_lowercase();

        let after_name = self.skip_ws(i);
        if self.bytes.get(after_name) != Some(&b'=') {
            return ((name, String::new()), i);
        }
        let value_start = self.skip_ws(after_name + 1);
        match self.bytes.get(value_start) {
            Some(&quote @ (b'"' | b'\'')) => {
                let body = value_start + 1;
                let end = self.bytes[body..]
                    .iter()
                    .position(|&b| b == quote)
                    .map_or(self.bytes.len(), |rel| body + rel);
                let value = decode(&self.src[body..end]);
                ((name, value), (end + 1).min(self.bytes.len()))
            }
            _ => {
                let mut end = value_start;
                while let Some(&b) = self.bytes.get(end) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    end += 1;
                }
                ((name, decode(&self.src[value_start..end])), end)
            }
        }
    }

    fn raw_text(&mut self, name: &str) {
        let closer = format!("</{}", name);
        let start = self.pos;
        let end = self.src[start..]
            .to_ascii_lowercase()
            .find(&closer)
            .map_or(self.bytes.len(), |rel| start + rel);
        if start < end {
            self.push(TokenKind::Text, start..end);
        }
        self.pos = end;
    }
}

/// Decode character references in text or an attribute value.
pub fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
