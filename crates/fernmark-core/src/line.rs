/// One input line with tabs expanded to the next 4-column stop.
///
/// The block engine works on the expanded text, where every indentation
/// question is a plain byte count. The original tab positions are kept so
/// verbatim content (code blocks) can be reconstructed with its tabs intact.
#[derive(Clone, Debug)]
pub struct NormalizedLine {
    text: String,
    tabs: Vec<TabExpansion>,
}

#[derive(Clone, Copy, Debug)]
struct TabExpansion {
    /// Column in the expanded text where the tab's spaces begin.
    col: usize,
    /// Number of spaces the tab expanded to (1..=4).
    width: usize,
}

impl NormalizedLine {
    pub fn new(raw: &str) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut tabs = Vec::new();
        let mut col = 0usize;
        for ch in raw.chars() {
            if ch == '\t' {
                let width = 4 - (col % 4);
                tabs.push(TabExpansion { col, width });
                for _ in 0..width {
                    text.push(' ');
                }
                col += width;
            } else {
                text.push(ch);
                col += ch.len_utf8();
            }
        }
        Self { text, tabs }
    }

    /// The tab-expanded text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.bytes().all(|b| b == b' ')
    }

    /// Expanded text from byte position `from` onward.
    pub fn slice(&self, from: usize) -> &str {
        let from = from.min(self.text.len());
        &self.text[from..]
    }

    /// Reconstructs the source form of the text from expanded column `col`
    /// onward, re-inserting a tab wherever its whole expansion survives the
    /// cut. A column landing inside an expansion keeps the remaining spaces.
    pub fn source_form(&self, col: usize) -> String {
        if self.tabs.is_empty() {
            return self.slice(col).to_string();
        }
        let mut out = String::new();
        let mut pos = col.min(self.text.len());
        let mut tab_idx = self.tabs.iter().position(|tab| tab.col + tab.width > pos);
        let end = self.text.len();
        while pos < end {
            let tab = match tab_idx.and_then(|idx| self.tabs.get(idx)) {
                Some(tab) if tab.col + tab.width > pos => *tab,
                _ => {
                    out.push_str(&self.text[pos..end]);
                    break;
                }
            };
            if pos < tab.col {
                out.push_str(&self.text[pos..tab.col]);
                pos = tab.col;
                continue;
            }
            if pos == tab.col {
                out.push('\t');
            } else {
                // Cut fell inside the expansion: the consumed part of the tab
                // stays as spaces.
                for _ in pos..tab.col + tab.width {
                    out.push(' ');
                }
            }
            pos = tab.col + tab.width;
            tab_idx = tab_idx.map(|idx| idx + 1);
        }
        out
    }
}

/// Splits a source string into normalized lines, treating `\n` and `\r\n`
/// alike. Any byte sequence is a valid input.
pub fn normalize_source(source: &str) -> Vec<NormalizedLine> {
    let mut lines = Vec::new();
    for raw in source.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        lines.push(NormalizedLine::new(raw));
    }
    // A trailing newline does not open an extra blank line.
    if source.ends_with('\n') {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::{NormalizedLine, normalize_source};

    #[test]
    fn tabs_expand_to_four_column_stops() {
        let line = NormalizedLine::new("\tfoo");
        assert_eq!(line.text(), "    foo");
        let line = NormalizedLine::new("ab\tcd");
        assert_eq!(line.text(), "ab  cd");
    }

    #[test]
    fn blank_detection_covers_tabs() {
        assert!(NormalizedLine::new("").is_blank());
        assert!(NormalizedLine::new(" \t ").is_blank());
        assert!(!NormalizedLine::new("  x").is_blank());
    }

    #[test]
    fn source_form_restores_whole_tabs() {
        let line = NormalizedLine::new("\tfoo\tbar");
        assert_eq!(line.source_form(0), "\tfoo\tbar");
        assert_eq!(line.source_form(4), "foo\tbar");
    }

    #[test]
    fn source_form_keeps_partial_expansions_as_spaces() {
        // The tab expands to columns 0..4; cutting at 2 keeps two spaces.
        let line = NormalizedLine::new("\tfoo");
        assert_eq!(line.source_form(2), "  foo");
    }

    #[test]
    fn normalize_source_drops_trailing_newline_only() {
        assert_eq!(normalize_source("a\nb\n").len(), 2);
        assert_eq!(normalize_source("a\nb").len(), 2);
        assert_eq!(normalize_source("a\n\n").len(), 2);
        assert_eq!(normalize_source("").len(), 1);
    }
}
