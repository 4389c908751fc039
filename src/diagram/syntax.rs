//! Line tokenizer for the flowchart DSL.
//!
//! Each source line is classified into at most one `Statement`. All spans are
//! byte ranges into the *untrimmed* line so callers can splice edits back in
//! without touching anything else on the line.

use std::ops::Range;

use super::types::{EdgeForm, NodeKind};

/// Keywords that start a non-graph statement (styling, interaction, layout).
const NON_GRAPH_KEYWORDS: [&str; 7] = [
    "style",
    "classdef",
    "class",
    "click",
    "linkstyle",
    "direction",
    "accdescr",
];

/// Characters an arrow body may be made of before its `>` head.
const ARROW_BODY: [char; 5] = ['-', '=', '.', '—', '–'];

pub const CLOSER_KEYWORD: &str = "end";

/// The body of a node shape: the text between its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeBody {
    /// Label text with surrounding quotes removed.
    pub text: String,
    /// Span of the body inside the delimiters, quotes included.
    pub span: Range<usize>,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeToken {
    pub id: String,
    pub id_span: Range<usize>,
    pub kind: NodeKind,
    /// `None` for a bare identifier.
    pub body: Option<ShapeBody>,
    /// Whole token, including any `:::class` suffix.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeToken {
    pub from: ShapeToken,
    pub to: ShapeToken,
    pub label: Option<String>,
    pub form: EdgeForm,
    /// Statement span, excluding leading indentation and a trailing `;`.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Blank,
    Comment,
    Direction(Option<String>),
    GroupOpen { title: String },
    GroupClose,
    Node(ShapeToken),
    Edge(EdgeToken),
    Other,
}

impl Statement {
    /// Shape tokens carried by the statement, in source order.
    pub fn shapes(&self) -> Vec<&ShapeToken> {
        match self {
            Statement::Node(shape) => vec![shape],
            Statement::Edge(edge) => vec![&edge.from, &edge.to],
            _ => vec![],
        }
    }
}

/// Classify a single source line.
pub fn classify(line: &str) -> Statement {
    let start = indent_len(line);
    let end = statement_end(line);
    if start >= end {
        return Statement::Blank;
    }
    let body = &line[start..end];

    if body.starts_with("%%") {
        return Statement::Comment;
    }

    let mut words = body.split_whitespace();
    let first = words.next().unwrap_or_default().to_ascii_lowercase();

    if first == "graph" || first == "flowchart" {
        return Statement::Direction(words.next().map(|w| w.to_string()));
    }
    if first == "subgraph" {
        let rest = body[first.len()..].trim();
        return Statement::GroupOpen {
            title: group_title(rest),
        };
    }
    if body == CLOSER_KEYWORD {
        return Statement::GroupClose;
    }
    if NON_GRAPH_KEYWORDS.contains(&first.as_str()) && body.len() > first.len() {
        return Statement::Other;
    }

    if let Some(edge) = parse_edge(line, start, end) {
        return Statement::Edge(edge);
    }
    if let Some(shape) = parse_shape(line, start, end) {
        if line[shape.span.end..end].trim().is_empty() {
            return Statement::Node(shape);
        }
    }
    Statement::Other
}

/// Byte length of the leading indentation of `line`.
pub fn indent_len(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// End of the statement proper: trailing whitespace and one `;` removed.
fn statement_end(line: &str) -> usize {
    let trimmed = line.trim_end();
    match trimmed.strip_suffix(';') {
        Some(rest) => rest.trim_end().len(),
        None => trimmed.len(),
    }
}

fn group_title(rest: &str) -> String {
    let rest = rest.trim_end_matches(';').trim();
    if let Some(quoted) = rest.strip_prefix('"') {
        return match quoted.find('"') {
            Some(close) => quoted[..close].trim().to_string(),
            None => quoted.trim().to_string(),
        };
    }
    if let Some(shape) = parse_shape(rest, 0, rest.len()) {
        if let Some(body) = shape.body {
            return body.text.trim().to_string();
        }
    }
    rest.to_string()
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

fn parse_edge(line: &str, start: usize, end: usize) -> Option<EdgeToken> {
    let arrow = find_arrows(&line[..end])
        .into_iter()
        .find(|a| a.start >= start)?;

    let mut form = EdgeForm::Plain;
    let mut label = None;

    // Left side: `A` or free-text form `A -- text`.
    let left = &line[start..arrow.start];
    let from_end = match find_top_level(left, "--") {
        Some(dash) => {
            let text = clean_label(&left[dash + 2..]);
            if text.is_some() {
                form = EdgeForm::Inline;
                label = text;
            }
            start + dash
        }
        None => arrow.start,
    };
    let from = parse_shape(line, start, from_end)?;
    if !line[from.span.end..from_end].trim().is_empty() {
        return None;
    }

    // Right side: `B` or piped form `|label| B`.
    let mut to_start = skip_ws(line, arrow.end).min(end);
    if line[to_start..end].starts_with('|') {
        let close = line[to_start + 1..end].find('|')? + to_start + 1;
        label = clean_label(&line[to_start + 1..close]);
        form = EdgeForm::Piped;
        to_start = close + 1;
    }
    let to = parse_shape(line, to_start, end)?;
    if !line[to.span.end..end].trim().is_empty() {
        return None;
    }

    Some(EdgeToken {
        from,
        to,
        label,
        form,
        span: start..end,
    })
}

/// Byte ranges of every arrow (`-->`, `->`, `==>`, `-.->`, …) outside
/// quotes, brackets and edge-label pipes.
pub fn find_arrows(line: &str) -> Vec<Range<usize>> {
    let chars: Vec<(usize, char)> = top_level_chars(line).collect();
    let mut arrows = Vec::new();
    let mut consumed = 0;

    for k in 0..chars.len() {
        let (head_idx, c) = chars[k];
        if c != '>' || k == 0 || head_idx < consumed {
            continue;
        }
        let mut first = k;
        while first > 0 {
            let (prev_idx, prev) = chars[first - 1];
            let contiguous = prev_idx + prev.len_utf8() == chars[first].0;
            if !contiguous || !ARROW_BODY.contains(&prev) || prev_idx < consumed {
                break;
            }
            first -= 1;
        }
        if first == k || chars[first..k].iter().all(|&(_, ch)| ch == '.') {
            continue;
        }
        arrows.push(chars[first].0..head_idx + 1);
        consumed = head_idx + 1;
    }
    arrows
}

/// Characters of `s` that sit outside quotes, bracket pairs and `|...|`.
pub fn top_level_chars(s: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut in_quote = false;
    let mut in_pipe = false;
    let mut depth = 0usize;
    s.char_indices().filter(move |&(_, c)| {
        if in_quote {
            if c == '"' {
                in_quote = false;
            }
            return false;
        }
        if in_pipe {
            if c == '|' {
                in_pipe = false;
            }
            return false;
        }
        match c {
            '"' => {
                in_quote = true;
                false
            }
            '[' | '{' | '(' => {
                depth += 1;
                false
            }
            ']' | '}' | ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            '|' if depth == 0 => {
                in_pipe = true;
                false
            }
            _ => depth == 0,
        }
    })
}

fn find_top_level(s: &str, pat: &str) -> Option<usize> {
    let first = pat.chars().next()?;
    top_level_chars(s)
        .filter(|&(_, c)| c == first)
        .map(|(idx, _)| idx)
        .find(|&idx| s[idx..].starts_with(pat))
}

fn clean_label(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_matches('"').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

// ---------------------------------------------------------------------------
// Node shapes
// ---------------------------------------------------------------------------

pub fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn skip_ws(line: &str, pos: usize) -> usize {
    pos + (line[pos..].len() - line[pos..].trim_start().len())
}

/// Parse a node shape token starting at (or after whitespace following) `pos`
/// and ending no later than `end`.
pub fn parse_shape(line: &str, pos: usize, end: usize) -> Option<ShapeToken> {
    let id_start = skip_ws(line, pos).min(end);
    let id_len: usize = line[id_start..end]
        .chars()
        .take_while(|&c| is_id_char(c))
        .map(char::len_utf8)
        .sum();
    if id_len == 0 {
        return None;
    }
    let id_end = id_start + id_len;
    let id = line[id_start..id_end].to_string();
    let rest = &line[id_end..end];

    let (kind, body, shape_end) = if rest.starts_with("([") {
        let (body, close) = read_body(line, id_end + 2, end, "])")?;
        (NodeKind::StartEnd, Some(body), close)
    } else if rest.starts_with("((") {
        let (body, close) = read_body(line, id_end + 2, end, "))")?;
        (NodeKind::StartEnd, Some(body), close)
    } else if rest.starts_with('(') {
        let (body, close) = read_body(line, id_end + 1, end, ")")?;
        (NodeKind::StartEnd, Some(body), close)
    } else if rest.starts_with('[') {
        let (body, close) = read_body(line, id_end + 1, end, "]")?;
        (NodeKind::Process, Some(body), close)
    } else if rest.starts_with('{') {
        let (body, close) = read_body(line, id_end + 1, end, "}")?;
        (NodeKind::Decision, Some(body), close)
    } else {
        (NodeKind::Process, None, id_end)
    };

    let span_end = skip_class_suffix(line, shape_end, end);
    Some(ShapeToken {
        id,
        id_span: id_start..id_end,
        kind,
        body,
        span: id_start..span_end,
    })
}

/// Read a shape body starting right after its opening delimiter.
/// Returns the body and the byte offset just past the closing delimiter.
fn read_body(line: &str, open_end: usize, end: usize, close: &str) -> Option<(ShapeBody, usize)> {
    let inner_start = skip_ws(line, open_end).min(end);
    let region = &line[..end];

    if region[inner_start..].starts_with('"') {
        let mut search = inner_start + 1;
        while let Some(rel) = region[search..].find('"') {
            let quote = search + rel;
            let after = skip_ws(region, quote + 1);
            if region[after..].starts_with(close) {
                return Some((
                    ShapeBody {
                        text: region[inner_start + 1..quote].to_string(),
                        span: inner_start..quote + 1,
                        quoted: true,
                    },
                    after + close.len(),
                ));
            }
            search = quote + 1;
        }
    }

    let close_at = find_closing(region, open_end, close)?;
    let raw = &region[open_end..close_at];
    let lead = raw.len() - raw.trim_start().len();
    let text = raw.trim();
    Some((
        ShapeBody {
            text: text.to_string(),
            span: open_end + lead..open_end + lead + text.len(),
            quoted: false,
        },
        close_at + close.len(),
    ))
}

/// Position of the delimiter closing an unquoted body. Single-character
/// delimiters are matched with nesting so `(a (b))` closes at the last `)`.
fn find_closing(region: &str, from: usize, close: &str) -> Option<usize> {
    if close.len() > 1 {
        return region[from..].find(close).map(|rel| from + rel);
    }
    let close_ch = close.chars().next()?;
    let open_ch = match close_ch {
        ']' => '[',
        '}' => '{',
        _ => '(',
    };
    let mut depth = 0usize;
    for (rel, c) in region[from..].char_indices() {
        if c == open_ch {
            depth += 1;
        } else if c == close_ch {
            if depth == 0 {
                return Some(from + rel);
            }
            depth -= 1;
        }
    }
    None
}

fn skip_class_suffix(line: &str, pos: usize, end: usize) -> usize {
    match line[pos..end].strip_prefix(":::") {
        Some(rest) => {
            let class_len: usize = rest
                .chars()
                .take_while(|&c| is_id_char(c) || c == '-')
                .map(char::len_utf8)
                .sum();
            pos + 3 + class_len
        }
        None => pos,
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Split a trailing parenthesized clause off a label:
/// `"Review (2 hours)"` → `("Review", Some("2 hours"))`.
pub fn split_time_suffix(label: &str) -> (String, Option<String>) {
    let trimmed = label.trim();
    let Some(without_close) = trimmed.strip_suffix(')') else {
        return (trimmed.to_string(), None);
    };

    let mut depth = 0usize;
    let mut open = None;
    for (idx, c) in without_close.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => {
                open = Some(idx);
                break;
            }
            '(' => depth -= 1,
            _ => {}
        }
    }

    match open {
        Some(idx) if idx > 0 => {
            let time = without_close[idx + 1..].trim();
            let base = without_close[..idx].trim_end();
            if time.is_empty() || base.is_empty() {
                (trimmed.to_string(), None)
            } else {
                (base.to_string(), Some(time.to_string()))
            }
        }
        _ => (trimmed.to_string(), None),
    }
}
