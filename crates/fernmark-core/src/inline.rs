use std::collections::HashMap;

use unicode_categories::UnicodeCategories;

use crate::ast::{Inline, InlineKind, InlineSeq, LinkDefinition};
use crate::entities::{decode_entity, percent_encode_url, unescape_and_decode};
use crate::linkdef::{normalize_link_label, parse_destination, parse_title};
use crate::matcher::{HandlerSet, InlineTrigger};

/// Runs the inline pass over one leaf's accumulated raw text. The link table
/// is complete by the time this runs, so reference lookups resolve directly.
pub(crate) fn parse_inlines(
    text: &str,
    link_defs: &HashMap<String, LinkDefinition>,
    handlers: &HandlerSet,
) -> InlineSeq {
    let scanner = InlineScanner {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        buf: String::new(),
        nodes: Vec::new(),
        delims: Vec::new(),
        brackets: Vec::new(),
        link_defs,
        handlers,
    };
    scanner.run()
}

/// An emphasis delimiter run, tied to the flat text node it was cut into.
/// Exhausted or enclosed runs are marked inactive rather than removed so
/// stack indices stay stable during pairing.
struct Delimiter {
    ch: u8,
    len: usize,
    orig_len: usize,
    node_index: usize,
    can_open: bool,
    can_close: bool,
    active: bool,
}

struct BracketEntry {
    node_index: usize,
    image: bool,
    active: bool,
    /// Byte position of the label text just after the bracket.
    label_start: usize,
    /// Delimiter stack height at push time; emphasis inside the bracket
    /// resolves against this bottom when the bracket closes.
    delim_bottom: usize,
}

struct InlineScanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    buf: String,
    nodes: InlineSeq,
    delims: Vec<Delimiter>,
    brackets: Vec<BracketEntry>,
    link_defs: &'a HashMap<String, LinkDefinition>,
    handlers: &'a HandlerSet,
}

impl<'a> InlineScanner<'a> {
    fn run(mut self) -> InlineSeq {
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b == b'\\' {
                self.backslash();
                continue;
            }
            if b == b'\n' {
                self.line_break();
                continue;
            }
            let consumed = match self.handlers.lookup(b) {
                Some(InlineTrigger::Emphasis) => self.emphasis(b),
                Some(InlineTrigger::CodeSpan) => self.code_span(),
                Some(InlineTrigger::AngleBracket) => self.angle_bracket(),
                Some(InlineTrigger::Entity) => self.entity(),
                Some(InlineTrigger::BracketOpen) => self.bracket_open(false),
                Some(InlineTrigger::Bang) => self.bang(),
                Some(InlineTrigger::BracketClose) => self.bracket_close(),
                None => 0,
            };
            if consumed == 0 {
                let ch = self.text[self.pos..].chars().next().unwrap_or('\u{fffd}');
                self.buf.push(ch);
                self.pos += ch.len_utf8();
            } else {
                self.pos += consumed;
            }
        }
        self.flush();
        self.process_emphasis(0);
        normalize_nodes(&mut self.nodes);
        self.nodes
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let text = std::mem::take(&mut self.buf);
            self.nodes.push(Inline::text(text));
        }
    }

    fn backslash(&mut self) {
        match self.bytes.get(self.pos + 1) {
            Some(b'\n') => {
                self.trim_buf_trailing_spaces();
                self.flush();
                self.nodes.push(Inline::new(InlineKind::HardBreak));
                self.pos += 2;
            }
            Some(b) if b.is_ascii_punctuation() => {
                self.buf.push(*b as char);
                self.pos += 2;
            }
            _ => {
                self.buf.push('\\');
                self.pos += 1;
            }
        }
    }

    fn line_break(&mut self) {
        let trailing = self.buf.len() - self.buf.trim_end_matches(' ').len();
        self.trim_buf_trailing_spaces();
        self.flush();
        let kind = if trailing >= 2 {
            InlineKind::HardBreak
        } else {
            InlineKind::SoftBreak
        };
        self.nodes.push(Inline::new(kind));
        self.pos += 1;
    }

    fn trim_buf_trailing_spaces(&mut self) {
        let keep = self.buf.trim_end_matches(' ').len();
        self.buf.truncate(keep);
    }

    fn emphasis(&mut self, ch: u8) -> usize {
        let run = self.bytes[self.pos..]
            .iter()
            .take_while(|b| **b == ch)
            .count();
        let before = self.text[..self.pos].chars().next_back();
        let after = self.text[self.pos + run..].chars().next();
        let before_ws = before.map_or(true, char::is_whitespace);
        let after_ws = after.map_or(true, char::is_whitespace);
        let before_punct = before.is_some_and(is_punctuation);
        let after_punct = after.is_some_and(is_punctuation);

        let left_flanking = !after_ws && (!after_punct || before_ws || before_punct);
        let right_flanking = !before_ws && (!before_punct || after_ws || after_punct);
        let (can_open, can_close) = if ch == b'_' {
            (
                left_flanking && (!right_flanking || before_punct),
                right_flanking && (!left_flanking || after_punct),
            )
        } else {
            (left_flanking, right_flanking)
        };

        self.flush();
        self.nodes
            .push(Inline::text(self.text[self.pos..self.pos + run].to_string()));
        self.delims.push(Delimiter {
            ch,
            len: run,
            orig_len: run,
            node_index: self.nodes.len() - 1,
            can_open,
            can_close,
            active: true,
        });
        run
    }

    fn code_span(&mut self) -> usize {
        let open = self.bytes[self.pos..]
            .iter()
            .take_while(|b| **b == b'`')
            .count();
        let mut i = self.pos + open;
        while i < self.bytes.len() {
            if self.bytes[i] == b'`' {
                let run = self.bytes[i..].iter().take_while(|b| **b == b'`').count();
                if run == open {
                    let content = &self.text[self.pos + open..i];
                    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
                    self.flush();
                    self.nodes
                        .push(Inline::new(InlineKind::CodeSpan(collapsed)));
                    return i + run - self.pos;
                }
                i += run;
            } else {
                i += 1;
            }
        }
        // No matching closer: the opening run is literal.
        self.buf
            .push_str(&self.text[self.pos..self.pos + open]);
        open
    }

    fn angle_bracket(&mut self) -> usize {
        if let Some((url, display, consumed)) = self.try_autolink() {
            self.flush();
            self.nodes.push(Inline::new(InlineKind::Link {
                url,
                title: None,
                children: vec![Inline::text(display)],
            }));
            return consumed;
        }
        if let Some(consumed) = self.scan_html_span() {
            let raw = self.text[self.pos..self.pos + consumed].to_string();
            self.flush();
            self.nodes.push(Inline::new(InlineKind::HtmlSpan { raw }));
            return consumed;
        }
        0
    }

    fn try_autolink(&self) -> Option<(String, String, usize)> {
        let mut end = self.pos + 1;
        while end < self.bytes.len() {
            match self.bytes[end] {
                b'>' => break,
                b'<' | b' ' | b'\n' => return None,
                b if b.is_ascii_control() => return None,
                _ => end += 1,
            }
        }
        if end >= self.bytes.len() || end == self.pos + 1 {
            return None;
        }
        let inner = &self.text[self.pos + 1..end];
        let consumed = end + 1 - self.pos;
        if is_uri_autolink(inner) {
            return Some((percent_encode_url(inner), inner.to_string(), consumed));
        }
        if is_email_autolink(inner) {
            let url = format!("mailto:{}", inner);
            return Some((percent_encode_url(&url), inner.to_string(), consumed));
        }
        None
    }

    fn scan_html_span(&self) -> Option<usize> {
        let rest = &self.bytes[self.pos..];
        if let Some(len) = scan_html_open_tag(rest).or_else(|| scan_html_close_tag(rest)) {
            return Some(len);
        }
        let text = &self.text[self.pos..];
        if let Some(stripped) = text.strip_prefix("<!--") {
            if stripped.starts_with('>') || stripped.starts_with("->") {
                return None;
            }
            let close = stripped.find("-->")?;
            return Some(4 + close + 3);
        }
        if text.starts_with("<![CDATA[") {
            let close = text[9..].find("]]>")?;
            return Some(9 + close + 3);
        }
        if text.starts_with("<?") {
            let close = text[2..].find("?>")?;
            return Some(2 + close + 2);
        }
        if text.starts_with("<!") && rest.get(2).is_some_and(|b| b.is_ascii_alphabetic()) {
            let close = text[2..].find('>')?;
            return Some(2 + close + 1);
        }
        None
    }

    fn entity(&mut self) -> usize {
        match decode_entity(&self.text[self.pos..]) {
            Some((decoded, used)) => {
                self.buf.push_str(&decoded);
                used
            }
            None => 0,
        }
    }

    fn bracket_open(&mut self, image: bool) -> usize {
        let width = if image { 2 } else { 1 };
        self.flush();
        self.nodes
            .push(Inline::text(if image { "![" } else { "[" }));
        self.brackets.push(BracketEntry {
            node_index: self.nodes.len() - 1,
            image,
            active: true,
            label_start: self.pos + width,
            delim_bottom: self.delims.len(),
        });
        width
    }

    fn bang(&mut self) -> usize {
        if self.bytes.get(self.pos + 1) == Some(&b'[') {
            self.bracket_open(true)
        } else {
            0
        }
    }

    /// The `]` handler: resolve the nearest bracket opener against, in order,
    /// an inline spec, a full reference, a collapsed reference, and a
    /// shortcut reference. One failure drops the opener for good.
    fn bracket_close(&mut self) -> usize {
        let entry = match self.brackets.pop() {
            Some(entry) => entry,
            None => return 0,
        };
        if !entry.active {
            return 0;
        }
        let label_end = self.pos;
        let after = self.pos + 1;

        let mut resolved: Option<(String, Option<String>, usize)> = None;
        if self.bytes.get(after) == Some(&b'(') {
            if let Some((url, title, end)) = self.parse_inline_spec(after) {
                resolved = Some((url, title, end - self.pos));
            }
        }
        if resolved.is_none() && self.bytes.get(after) == Some(&b'[') {
            if let Some((label, used)) = scan_link_label(&self.text[after..]) {
                let key = if label.is_empty() {
                    normalize_link_label(&self.text[entry.label_start..label_end])
                } else {
                    normalize_link_label(label)
                };
                if let Some(def) = self.link_defs.get(&key) {
                    resolved = Some((def.url.clone(), def.title.clone(), 1 + used));
                }
            }
        }
        if resolved.is_none() && self.bytes.get(after) != Some(&b'[') {
            let key = normalize_link_label(&self.text[entry.label_start..label_end]);
            if !key.is_empty() {
                if let Some(def) = self.link_defs.get(&key) {
                    resolved = Some((def.url.clone(), def.title.clone(), 1));
                }
            }
        }

        let (url, title, consumed) = match resolved {
            Some(hit) => hit,
            None => return 0,
        };
        self.flush();
        self.process_emphasis(entry.delim_bottom);
        let children: InlineSeq = self.nodes.drain(entry.node_index + 1..).collect();
        self.nodes.pop();
        if entry.image {
            self.nodes.push(Inline::new(InlineKind::Image {
                url,
                title,
                alt: children,
            }));
        } else {
            // No links inside links: earlier link openers go dead.
            for bracket in self.brackets.iter_mut() {
                if !bracket.image {
                    bracket.active = false;
                }
            }
            self.nodes.push(Inline::new(InlineKind::Link {
                url,
                title,
                children,
            }));
        }
        consumed
    }

    /// Parses `(dest "title")` starting at the opening parenthesis. Returns
    /// the encoded destination, title, and the byte position after `)`.
    fn parse_inline_spec(&self, open: usize) -> Option<(String, Option<String>, usize)> {
        let mut pos = self.skip_spec_whitespace(open + 1);
        let dest = if self.bytes.get(pos) == Some(&b')') {
            ""
        } else {
            let (dest, used) = parse_destination(&self.text[pos..])?;
            pos = self.skip_spec_whitespace(pos + used);
            dest
        };
        let title = match self.bytes.get(pos) {
            Some(b'"') | Some(b'\'') | Some(b'(') if self.bytes.get(pos) != Some(&b')') => {
                let (raw, used) = parse_title(&self.text[pos..])?;
                pos = self.skip_spec_whitespace(pos + used);
                Some(unescape_and_decode(raw))
            }
            _ => None,
        };
        if self.bytes.get(pos) != Some(&b')') {
            return None;
        }
        let url = percent_encode_url(&unescape_and_decode(dest));
        Some((url, title, pos + 1))
    }

    fn skip_spec_whitespace(&self, mut pos: usize) -> usize {
        while matches!(self.bytes.get(pos), Some(b' ') | Some(b'\n')) {
            pos += 1;
        }
        pos
    }

    /// Resolves emphasis runs above `stack_bottom`, pairing each closer with
    /// the nearest eligible opener. The per-slot bottoms keep failed regions
    /// from being rescanned, so long runs stay linear.
    fn process_emphasis(&mut self, stack_bottom: usize) {
        let mut openers_bottom = [stack_bottom; 12];
        let mut closer = stack_bottom;
        while closer < self.delims.len() {
            let d = &self.delims[closer];
            if !(d.active && d.can_close && d.len > 0) {
                closer += 1;
                continue;
            }
            let ch = d.ch;
            let slot = slot_index(ch, d.can_open, d.orig_len);
            let bottom = openers_bottom[slot];
            let mut opener = None;
            let mut i = closer;
            while i > bottom {
                i -= 1;
                let o = &self.delims[i];
                if o.active
                    && o.len > 0
                    && o.ch == ch
                    && o.can_open
                    && !multiple_of_three_blocked(o, &self.delims[closer])
                {
                    opener = Some(i);
                    break;
                }
            }
            match opener {
                Some(o) => self.pair(o, closer),
                None => {
                    openers_bottom[slot] = closer;
                    closer += 1;
                }
            }
        }
        self.delims.truncate(stack_bottom);
    }

    fn pair(&mut self, opener: usize, closer: usize) {
        let used = self.delims[opener].len.min(self.delims[closer].len).min(2);
        let opener_node = self.delims[opener].node_index;
        let closer_node = self.delims[closer].node_index;

        if let InlineKind::Text(t) = &mut self.nodes[opener_node].kind {
            t.truncate(t.len() - used);
        }
        if let InlineKind::Text(t) = &mut self.nodes[closer_node].kind {
            t.drain(..used);
        }

        let children: InlineSeq = self.nodes.drain(opener_node + 1..closer_node).collect();
        let count = children.len() as isize;
        let kind = if used == 2 {
            InlineKind::Strong(children)
        } else {
            InlineKind::Emph(children)
        };
        self.nodes.insert(opener_node + 1, Inline::new(kind));

        // Runs enclosed by the new node can never pair again; everything at
        // or after the closer's node shifts by the splice.
        let delta = count - 1;
        for (idx, d) in self.delims.iter_mut().enumerate() {
            if idx > opener && idx < closer {
                d.active = false;
                d.node_index = opener_node + 1;
            } else if d.node_index >= closer_node {
                d.node_index = (d.node_index as isize - delta) as usize;
            }
        }
        self.delims[opener].len -= used;
        self.delims[closer].len -= used;
        if self.delims[opener].len == 0 {
            self.delims[opener].active = false;
        }
        if self.delims[closer].len == 0 {
            self.delims[closer].active = false;
        }
    }
}

fn slot_index(ch: u8, can_open: bool, orig_len: usize) -> usize {
    let base = if ch == b'*' { 0 } else { 6 };
    base + if can_open { 3 } else { 0 } + orig_len % 3
}

fn multiple_of_three_blocked(opener: &Delimiter, closer: &Delimiter) -> bool {
    (closer.can_open || opener.can_close)
        && (opener.orig_len + closer.orig_len) % 3 == 0
        && !(opener.orig_len % 3 == 0 && closer.orig_len % 3 == 0)
}

/// Flanking treats the Unicode punctuation and symbol categories as
/// punctuation, same as the ASCII set.
fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation() || ch.is_punctuation() || ch.is_symbol()
}

/// Drops text nodes emptied by delimiter consumption and merges adjacent
/// text fragments left behind by the run-splitting scanner.
fn normalize_nodes(nodes: &mut InlineSeq) {
    for node in nodes.iter_mut() {
        match &mut node.kind {
            InlineKind::Emph(children)
            | InlineKind::Strong(children)
            | InlineKind::Link { children, .. }
            | InlineKind::Image { alt: children, .. } => normalize_nodes(children),
            _ => {}
        }
    }
    nodes.retain(|n| !matches!(&n.kind, InlineKind::Text(t) if t.is_empty()));
    let mut merged: InlineSeq = Vec::with_capacity(nodes.len());
    for node in std::mem::take(nodes) {
        match (merged.last_mut(), &node.kind) {
            (
                Some(Inline {
                    kind: InlineKind::Text(prev),
                }),
                InlineKind::Text(t),
            ) => prev.push_str(t),
            _ => merged.push(node),
        }
    }
    *nodes = merged;
}

/// Scans a `[label]` at the start of `text`. Returns the raw label and the
/// bytes consumed including both brackets. An empty label is a collapsed
/// reference.
fn scan_link_label(text: &str) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut pos = 1;
    loop {
        if pos > 1000 {
            return None;
        }
        match bytes.get(pos)? {
            b'\\' if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_punctuation() => pos += 2,
            b']' => return Some((&text[1..pos], pos + 1)),
            b'[' => return None,
            _ => pos += 1,
        }
    }
}

fn is_uri_autolink(s: &str) -> bool {
    let colon = match s.find(':') {
        Some(i) => i,
        None => return false,
    };
    if !(2..=32).contains(&colon) {
        return false;
    }
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

fn is_email_autolink(s: &str) -> bool {
    let at = match s.find('@') {
        Some(i) => i,
        None => return false,
    };
    let (local, domain) = (&s[..at], &s[at + 1..]);
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    let local_ok = local.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '.' | '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '/' | '=' | '?' | '^'
                    | '_' | '`' | '{' | '|' | '}' | '~' | '-'
            )
    });
    if !local_ok {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

fn skip_tag_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while matches!(bytes.get(pos), Some(b' ') | Some(b'\t') | Some(b'\n')) {
        pos += 1;
    }
    pos
}

/// Scans an HTML open tag (`<name attr="v" />`) at the start of `bytes`.
/// Returns the total length on a match. Shared with the block pass for the
/// standalone-tag HTML block kind.
pub(crate) fn scan_html_open_tag(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let mut pos = 1;
    if !bytes.get(pos)?.is_ascii_alphabetic() {
        return None;
    }
    pos += 1;
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
    {
        pos += 1;
    }
    loop {
        let after_ws = skip_tag_whitespace(bytes, pos);
        if after_ws == pos {
            break;
        }
        match scan_attribute(bytes, after_ws) {
            Some(end) => pos = end,
            None => {
                pos = after_ws;
                break;
            }
        }
    }
    if bytes.get(pos) == Some(&b'/') {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'>') {
        Some(pos + 1)
    } else {
        None
    }
}

pub(crate) fn scan_html_close_tag(bytes: &[u8]) -> Option<usize> {
    if !bytes.starts_with(b"</") {
        return None;
    }
    let mut pos = 2;
    if !bytes.get(pos)?.is_ascii_alphabetic() {
        return None;
    }
    pos += 1;
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
    {
        pos += 1;
    }
    pos = skip_tag_whitespace(bytes, pos);
    if bytes.get(pos) == Some(&b'>') {
        Some(pos + 1)
    } else {
        None
    }
}

fn scan_attribute(bytes: &[u8], mut pos: usize) -> Option<usize> {
    let first = bytes.get(pos)?;
    if !(first.is_ascii_alphabetic() || matches!(first, b'_' | b':')) {
        return None;
    }
    pos += 1;
    while bytes
        .get(pos)
        .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-'))
    {
        pos += 1;
    }
    let eq = skip_tag_whitespace(bytes, pos);
    if bytes.get(eq) != Some(&b'=') {
        return Some(pos);
    }
    let mut vpos = skip_tag_whitespace(bytes, eq + 1);
    match bytes.get(vpos)? {
        q @ (b'"' | b'\'') => {
            let q = *q;
            vpos += 1;
            while bytes.get(vpos).is_some_and(|b| *b != q) {
                vpos += 1;
            }
            if bytes.get(vpos) != Some(&q) {
                return None;
            }
            Some(vpos + 1)
        }
        _ => {
            let start = vpos;
            while bytes.get(vpos).is_some_and(|b| {
                !matches!(b, b' ' | b'\t' | b'\n' | b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            }) {
                vpos += 1;
            }
            if vpos == start {
                return None;
            }
            Some(vpos)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{parse_inlines, scan_html_close_tag, scan_html_open_tag, scan_link_label};
    use crate::ast::{InlineKind, LinkDefinition};
    use crate::matcher::HandlerSet;

    fn parse(text: &str) -> Vec<InlineKind> {
        parse_inlines(text, &HashMap::new(), &HandlerSet::standard())
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    #[test]
    fn plain_text_stays_one_node() {
        assert_eq!(parse("hello"), vec![InlineKind::Text("hello".into())]);
    }

    #[test]
    fn single_emphasis() {
        let out = parse("*foo*");
        assert_eq!(out.len(), 1);
        match &out[0] {
            InlineKind::Emph(children) => {
                assert_eq!(children[0].kind, InlineKind::Text("foo".into()));
            }
            other => panic!("expected emphasis, got {:?}", other),
        }
    }

    #[test]
    fn triple_run_nests_strong_inside_em() {
        let out = parse("***foo***");
        assert_eq!(out.len(), 1);
        match &out[0] {
            InlineKind::Emph(children) => match &children[0].kind {
                InlineKind::Strong(inner) => {
                    assert_eq!(inner[0].kind, InlineKind::Text("foo".into()));
                }
                other => panic!("expected strong inside, got {:?}", other),
            },
            other => panic!("expected emphasis outside, got {:?}", other),
        }
    }

    #[test]
    fn multiple_of_three_rule_blocks_pairing() {
        // The double opener and single closer sum to three, so the single
        // star closes nothing and the doubles pair around everything.
        let out = parse("**foo*bar**");
        match &out[0] {
            InlineKind::Strong(children) => {
                assert_eq!(children[0].kind, InlineKind::Text("foo*bar".into()));
            }
            other => panic!("expected strong, got {:?}", other),
        }
    }

    #[test]
    fn underscore_intraword_is_literal() {
        assert_eq!(parse("foo_bar_baz"), vec![InlineKind::Text("foo_bar_baz".into())]);
        assert_eq!(parse("foo*bar*").len(), 2);
    }

    #[test]
    fn code_span_trims_and_collapses_whitespace() {
        let out = parse("`` a   b ``");
        assert_eq!(out, vec![InlineKind::CodeSpan("a b".into())]);
        assert_eq!(parse("`a`"), vec![InlineKind::CodeSpan("a".into())]);
        // Unmatched opener stays literal.
        assert_eq!(parse("``x`"), vec![InlineKind::Text("``x`".into())]);
    }

    #[test]
    fn code_span_wins_over_emphasis() {
        let out = parse("*`x`*");
        // `*` before a code span still pairs around it.
        match &out[0] {
            InlineKind::Emph(children) => {
                assert_eq!(children[0].kind, InlineKind::CodeSpan("x".into()));
            }
            other => panic!("expected emphasis, got {:?}", other),
        }
    }

    #[test]
    fn uri_and_email_autolinks() {
        let out = parse("<https://example.com/a b>");
        assert_eq!(out.len(), 1, "space disqualifies the autolink: {:?}", out);
        let out = parse("<https://example.com/x>");
        match &out[0] {
            InlineKind::Link { url, children, .. } => {
                assert_eq!(url, "https://example.com/x");
                assert_eq!(children[0].kind, InlineKind::Text("https://example.com/x".into()));
            }
            other => panic!("expected link, got {:?}", other),
        }
        let out = parse("<me@example.com>");
        match &out[0] {
            InlineKind::Link { url, .. } => assert_eq!(url, "mailto:me@example.com"),
            other => panic!("expected mailto link, got {:?}", other),
        }
    }

    #[test]
    fn raw_html_span() {
        let out = parse("a <em class=\"x\"> b");
        assert_eq!(
            out[1],
            InlineKind::HtmlSpan {
                raw: "<em class=\"x\">".into()
            }
        );
        let out = parse("a <not a tag");
        assert_eq!(out, vec![InlineKind::Text("a <not a tag".into())]);
    }

    #[test]
    fn inline_link_with_title() {
        let out = parse("[text](/url \"hi\")");
        match &out[0] {
            InlineKind::Link {
                url,
                title,
                children,
            } => {
                assert_eq!(url, "/url");
                assert_eq!(title.as_deref(), Some("hi"));
                assert_eq!(children[0].kind, InlineKind::Text("text".into()));
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn reference_forms_resolve_in_order() {
        let mut defs = HashMap::new();
        defs.insert(
            "label".to_string(),
            LinkDefinition {
                url: "/ref".to_string(),
                title: None,
            },
        );
        let handlers = HandlerSet::standard();
        for text in ["[x][label]", "[Label][]", "[LABEL]"] {
            let out = parse_inlines(text, &defs, &handlers);
            match &out[0].kind {
                InlineKind::Link { url, .. } => assert_eq!(url, "/ref", "for {}", text),
                other => panic!("expected link for {}, got {:?}", text, other),
            }
        }
        let out = parse_inlines("[missing]", &defs, &handlers);
        assert_eq!(out[0].kind, InlineKind::Text("[missing]".into()));
    }

    #[test]
    fn no_links_inside_links() {
        let mut defs = HashMap::new();
        defs.insert(
            "inner".to_string(),
            LinkDefinition {
                url: "/inner".to_string(),
                title: None,
            },
        );
        let out = parse_inlines("[a [inner] b](/outer)", &defs, &HandlerSet::standard());
        // The inner bracket resolves first; the outer opener is deactivated,
        // so the outer link never forms.
        let links: Vec<_> = out
            .iter()
            .filter(|n| matches!(n.kind, InlineKind::Link { .. }))
            .collect();
        assert_eq!(links.len(), 1);
        match &links[0].kind {
            InlineKind::Link { url, .. } => assert_eq!(url, "/inner"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn image_alt_holds_children() {
        let out = parse("![alt *x*](/img.png)");
        match &out[0] {
            InlineKind::Image { url, alt, .. } => {
                assert_eq!(url, "/img.png");
                assert_eq!(alt[0].kind, InlineKind::Text("alt ".into()));
                assert!(matches!(alt[1].kind, InlineKind::Emph(_)));
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn emphasis_inside_link_text() {
        let out = parse("[*em* text](/u)");
        match &out[0] {
            InlineKind::Link { children, .. } => {
                assert!(matches!(children[0].kind, InlineKind::Emph(_)));
                assert_eq!(children[1].kind, InlineKind::Text(" text".into()));
            }
            other => panic!("expected link, got {:?}", other),
        }
    }

    #[test]
    fn hard_and_soft_breaks() {
        let out = parse("a  \nb");
        assert_eq!(out[1], InlineKind::HardBreak);
        let out = parse("a\nb");
        assert_eq!(out[1], InlineKind::SoftBreak);
        let out = parse("a\\\nb");
        assert_eq!(out[1], InlineKind::HardBreak);
    }

    #[test]
    fn backslash_escapes_punctuation() {
        assert_eq!(parse("\\*not em\\*"), vec![InlineKind::Text("*not em*".into())]);
        assert_eq!(parse("\\a"), vec![InlineKind::Text("\\a".into())]);
    }

    #[test]
    fn entities_decode_in_text() {
        assert_eq!(parse("a&amp;b&#33;"), vec![InlineKind::Text("a&b!".into())]);
        assert_eq!(parse("a&bogus;"), vec![InlineKind::Text("a&bogus;".into())]);
    }

    #[test]
    fn reduced_handler_set_leaves_triggers_literal() {
        let mut handlers = HandlerSet::standard();
        handlers.remove(b'*');
        let out = parse_inlines("*foo*", &HashMap::new(), &handlers);
        assert_eq!(out[0].kind, InlineKind::Text("*foo*".into()));
    }

    #[test]
    fn label_and_tag_scanners() {
        assert_eq!(scan_link_label("[a b]"), Some(("a b", 5)));
        assert_eq!(scan_link_label("[]"), Some(("", 2)));
        assert_eq!(scan_link_label("[a[b]"), None);
        assert!(scan_html_open_tag(b"<a href='x'>").is_some());
        assert!(scan_html_open_tag(b"<a href=>").is_none());
        assert!(scan_html_close_tag(b"</div >").is_some());
    }
}
