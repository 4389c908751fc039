//! Line-level source editor and statement formatting for the flowchart DSL.
//!
//! Edits are addressed by *original* line index, so removals and insertions
//! never shift the coordinates of other pending edits.

use super::types::NodeKind;

pub struct SourceEditor {
    lines: Vec<Option<String>>,
    /// `inserted[i]` holds new lines placed before original line `i`;
    /// `inserted[len]` holds lines appended at the end.
    inserted: Vec<Vec<String>>,
}

impl SourceEditor {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| Some(l.to_string())).collect(),
            inserted: vec![Vec::new(); lines.len() + 1],
        }
    }

    /// Replace a byte range inside one line. Several splices on the same
    /// line must be applied right to left.
    pub fn splice(&mut self, idx: usize, range: std::ops::Range<usize>, text: &str) {
        if let Some(Some(line)) = self.lines.get_mut(idx) {
            line.replace_range(range, text);
        }
    }

    pub fn set_line(&mut self, idx: usize, text: impl Into<String>) {
        if let Some(slot) = self.lines.get_mut(idx) {
            *slot = Some(text.into());
        }
    }

    pub fn remove(&mut self, idx: usize) {
        if let Some(slot) = self.lines.get_mut(idx) {
            *slot = None;
        }
    }

    pub fn insert_before(&mut self, idx: usize, text: impl Into<String>) {
        let at = idx.min(self.lines.len());
        self.inserted[at].push(text.into());
    }

    pub fn insert_after(&mut self, idx: usize, text: impl Into<String>) {
        self.insert_before(idx + 1, text);
    }

    /// Consume the editor and return the rebuilt source.
    pub fn finish(self) -> String {
        let mut out: Vec<String> = Vec::with_capacity(self.lines.len() + 4);
        let mut inserted = self.inserted.into_iter();
        for line in self.lines {
            if let Some(before) = inserted.next() {
                out.extend(before);
            }
            if let Some(line) = line {
                out.push(line);
            }
        }
        for tail in inserted {
            out.extend(tail);
        }
        out.join("\n")
    }
}

/// Leading whitespace of a line.
pub fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// `id["label"]`, `id{"label"}` or `id(["label"])`.
pub fn format_node(id: &str, kind: NodeKind, label: &str) -> String {
    let (open, close) = kind.delimiters();
    format!("{}{}\"{}\"{}", id, open, label, close)
}

/// `from --> to` or `from -->|"label"| to`.
pub fn format_edge(from: &str, to: &str, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.trim().is_empty() => {
            format!("{} -->|\"{}\"| {}", from, label.trim(), to)
        }
        _ => format!("{} --> {}", from, to),
    }
}

/// Label text with `time` appended as a parenthesized suffix.
pub fn with_time_suffix(label: &str, time: Option<&str>) -> String {
    match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(time) => format!("{} ({})", label.trim(), time),
        None => label.trim().to_string(),
    }
}

/// Make user-supplied text safe inside a double-quoted label.
pub fn sanitize_label(text: &str) -> String {
    let mut cleaned = text.replace('"', "'");
    for tag in ["<br/>", "<br />", "<br>", "<BR>", "<BR/>", "<BR />"] {
        cleaned = cleaned.replace(tag, " ");
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_source_round_trips() {
        let source = "graph TD\n  A[\"x\"]\n\n  A --> B\n";
        let lines: Vec<&str> = source.split('\n').collect();
        assert_eq!(SourceEditor::new(&lines).finish(), source);
    }

    #[test]
    fn edits_use_original_indices() {
        let lines = ["a", "b", "c"];
        let mut e = SourceEditor::new(&lines);
        e.remove(0);
        e.insert_after(1, "b2");
        e.splice(2, 0..1, "C");
        e.insert_before(0, "top");
        assert_eq!(e.finish(), "top\nb\nb2\nC");
    }

    #[test]
    fn insert_past_end_appends() {
        let lines = ["a"];
        let mut e = SourceEditor::new(&lines);
        e.insert_before(10, "z");
        assert_eq!(e.finish(), "a\nz");
    }

    #[test]
    fn formats_statements() {
        assert_eq!(format_node("A", NodeKind::Process, "Do it"), "A[\"Do it\"]");
        assert_eq!(format_node("S", NodeKind::StartEnd, "Start"), "S([\"Start\"])");
        assert_eq!(format_edge("A", "B", None), "A --> B");
        assert_eq!(format_edge("A", "B", Some("Yes")), "A -->|\"Yes\"| B");
    }

    #[test]
    fn sanitizes_labels() {
        assert_eq!(sanitize_label("Say \"hi\"<br>now "), "Say 'hi' now");
        assert_eq!(with_time_suffix("Review", Some("2 hours")), "Review (2 hours)");
        assert_eq!(with_time_suffix("Review ", Some("  ")), "Review");
    }
}
