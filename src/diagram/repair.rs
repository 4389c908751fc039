//! Syntax validator: a repair pass over flowchart source.
//!
//! Never rejects input. Every value returned satisfies: the source opens with
//! a direction directive, arrows are canonical, the closer keyword appears
//! only as a group closer, and group depth returns to zero. The pass is a
//! fixed point: `validate(validate(x)) == validate(x)`.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::syntax::{self, CLOSER_KEYWORD, Statement};
use super::writer::indent_of;
use crate::config::EngineConfig;

/// Repair `source` using the default configuration.
pub fn validate(source: &str) -> String {
    validate_with(source, &EngineConfig::default())
}

pub fn validate_with(source: &str, config: &EngineConfig) -> String {
    let directive = format!("graph {}", config.diagram.default_direction);
    let source = strip_code_fence(source);
    if source.trim().is_empty() {
        return directive;
    }

    let mut lines: Vec<String> = source.split('\n').map(normalize_line).collect();

    let first_significant = lines
        .iter()
        .map(|l| syntax::classify(l))
        .find(|s| !matches!(s, Statement::Blank | Statement::Comment));
    if !matches!(first_significant, Some(Statement::Direction(_))) {
        debug!("prepending missing direction directive");
        lines.insert(0, directive);
    }

    balance_groups(lines, &config.diagram.reserved_word_replacement).join("\n")
}

/// Remove a Markdown code fence wrapped around the whole source.
fn strip_code_fence(source: &str) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return source.to_string();
    };
    if !lines[first].trim().starts_with("```") {
        return source.to_string();
    }

    let mut kept: Vec<&str> = lines[first + 1..].to_vec();
    if let Some(last) = kept.iter().rposition(|l| !l.trim().is_empty()) {
        if kept[last].trim() == "```" {
            kept.remove(last);
        }
    }
    debug!("stripped surrounding code fence");
    kept.join("\n")
}

// ---------------------------------------------------------------------------
// Per-line text normalization
// ---------------------------------------------------------------------------

fn line_break_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*<br\s*/?>\s*").expect("valid regex"))
}

fn inline_markup_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?(?:b|i|u|em|strong|span|small|sub|sup)\b[^>]*>").expect("valid regex")
    })
}

fn normalize_line(line: &str) -> String {
    let mut text: String = line
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect();

    // Removing one tag can expose another (`<<b>br>`), so strip to a fixed point.
    while text.contains('<') {
        let stripped = line_break_tag().replace_all(&text, " ");
        let stripped = inline_markup_tag().replace_all(&stripped, "").into_owned();
        if stripped == text {
            break;
        }
        text = stripped;
    }

    normalize_arrows(&text)
}

/// Rewrite every arrow variant to the canonical `-->`.
pub(crate) fn normalize_arrows(line: &str) -> String {
    let mut text = line.to_string();
    for range in syntax::find_arrows(line).into_iter().rev() {
        if &text[range.clone()] != "-->" {
            text.replace_range(range, "-->");
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Structural pass: closers, reserved identifiers, group balance
// ---------------------------------------------------------------------------

fn balance_groups(lines: Vec<String>, replacement: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len() + 2);
    let mut open: Vec<String> = Vec::new();

    for line in lines {
        let statement = syntax::classify(&line);
        match statement {
            Statement::GroupOpen { .. } => {
                open.push(indent_of(&line).to_string());
                out.push(line);
            }
            Statement::GroupClose => {
                if open.pop().is_some() {
                    out.push(line);
                } else {
                    debug!("dropping closer with no open group");
                }
            }
            _ if !open.is_empty() && is_corrupted_closer(&line) => {
                debug!("normalizing corrupted closer '{}'", line.trim());
                open.pop();
                out.push(format!("{}{}", indent_of(&line), CLOSER_KEYWORD));
            }
            Statement::Node(_) | Statement::Edge(_) => {
                out.push(rewrite_shapes(&line, &statement, replacement));
            }
            Statement::Other if is_styling(&line) => {
                out.push(rename_closer_references(&line, replacement));
            }
            _ => out.push(line),
        }
    }

    if !open.is_empty() {
        debug!("appending {} missing closer(s)", open.len());
        let trailing_blank = out.iter().rev().take_while(|l| l.trim().is_empty()).count();
        let at = out.len() - trailing_blank;
        let closers: Vec<String> = open
            .iter()
            .rev()
            .map(|indent| format!("{}{}", indent, CLOSER_KEYWORD))
            .collect();
        out.splice(at..at, closers);
    }

    out
}

/// `style`, `class`, `click` and `linkStyle` statements name nodes by id and
/// must follow a node renamed away from the closer keyword.
fn is_styling(line: &str) -> bool {
    matches!(
        line.split_whitespace().next(),
        Some("style" | "class" | "click" | "linkStyle")
    )
}

/// A closer an LLM misspelled: `End`, `END;`, `end.`, `endsubgraph`, `end subgraph`.
fn is_corrupted_closer(line: &str) -> bool {
    let squashed: String = line
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_' | ';' | '.'))
        .flat_map(char::to_lowercase)
        .collect();
    matches!(squashed.as_str(), "end" | "endsubgraph" | "endgroup")
}

/// Rename node identifiers spelled like the closer keyword and turn
/// single-quoted shape bodies into double-quoted ones.
fn rewrite_shapes(line: &str, statement: &Statement, replacement: &str) -> String {
    let mut edits: Vec<(std::ops::Range<usize>, String)> = Vec::new();

    for shape in statement.shapes() {
        if shape.id == CLOSER_KEYWORD {
            debug!("renaming node '{}' to '{}'", CLOSER_KEYWORD, replacement);
            edits.push((shape.id_span.clone(), replacement.to_string()));
        }
        if let Some(body) = &shape.body {
            let text = body.text.as_str();
            let single_quoted = !body.quoted
                && text.len() >= 2
                && text.starts_with('\'')
                && text.ends_with('\'')
                && !text.contains('"');
            if single_quoted {
                edits.push((body.span.clone(), format!("\"{}\"", &text[1..text.len() - 1])));
            }
        }
    }

    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut text = line.to_string();
    for (range, replacement) in edits {
        text.replace_range(range, &replacement);
    }
    text
}

/// Rename whole-word uses of the closer keyword in styling statements
/// (`style end …`, `class end …`) so they follow a renamed node.
pub(crate) fn rename_closer_references(line: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find(CLOSER_KEYWORD) {
        let before = rest[..pos].chars().next_back();
        let after = rest[pos + CLOSER_KEYWORD.len()..].chars().next();
        let whole_word = before.is_none_or(|c| !syntax::is_id_char(c))
            && after.is_none_or(|c| !syntax::is_id_char(c));
        out.push_str(&rest[..pos]);
        out.push_str(if whole_word { replacement } else { CLOSER_KEYWORD });
        rest = &rest[pos + CLOSER_KEYWORD.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_directive() {
        assert_eq!(validate("A --> B"), "graph TD\nA --> B");
        assert_eq!(validate(""), "graph TD");
    }

    #[test]
    fn keeps_existing_directive_after_comment() {
        let src = "%% generated\nflowchart LR\nA --> B";
        assert_eq!(validate(src), src);
    }

    #[test]
    fn normalizes_arrows_quotes_and_breaks() {
        assert_eq!(
            validate("graph TD\nA[\u{201C}Fill form<br/>online\u{201D}] -> B"),
            "graph TD\nA[\"Fill form online\"] --> B"
        );
        assert_eq!(validate("graph TD\nA ==> B"), "graph TD\nA --> B");
        assert_eq!(validate("graph TD\nA['Quoted'] --> B"), "graph TD\nA[\"Quoted\"] --> B");
    }

    #[test]
    fn nested_tags_strip_in_one_pass() {
        let once = validate("graph TD\nA[\"x <<b>b> y\"] --> B\nC[x<br<br>>y]");
        assert_eq!(once, "graph TD\nA[\"x  y\"] --> B\nC[x y]");
        assert_eq!(validate(&once), once);
    }

    #[test]
    fn renamed_end_node_keeps_its_styles() {
        assert_eq!(
            validate("graph TD\nA --> end\nstyle end fill:#f9f\nclass end,A done"),
            "graph TD\nA --> endProcess\nstyle endProcess fill:#f9f\nclass endProcess,A done"
        );
    }

    #[test]
    fn renames_end_node() {
        assert_eq!(
            validate("graph TD\nA --> end\nend[\"Done\"]"),
            "graph TD\nA --> endProcess\nendProcess[\"Done\"]"
        );
    }

    #[test]
    fn corrupted_closer_only_inside_group() {
        assert_eq!(
            validate("graph TD\nsubgraph \"G\"\n  A\nEnd\nEnd"),
            "graph TD\nsubgraph \"G\"\n  A\nend\nEnd"
        );
    }

    #[test]
    fn drops_stray_and_appends_missing_closers() {
        assert_eq!(validate("graph TD\nend\nA"), "graph TD\nA");
        assert_eq!(
            validate("graph TD\nsubgraph \"Outer\"\n  subgraph \"Inner\"\n    A\n"),
            "graph TD\nsubgraph \"Outer\"\n  subgraph \"Inner\"\n    A\n  end\nend\n"
        );
    }

    #[test]
    fn strips_code_fence() {
        assert_eq!(validate("```mermaid\ngraph TD\nA --> B\n```"), "graph TD\nA --> B");
    }

    #[test]
    fn renames_closer_in_style_lines() {
        assert_eq!(
            rename_closer_references("style end fill:#f9f,stroke:#333", "endProcess"),
            "style endProcess fill:#f9f,stroke:#333"
        );
        assert_eq!(rename_closer_references("class ending x", "endProcess"), "class ending x");
    }
}
