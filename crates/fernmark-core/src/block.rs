use std::collections::HashMap;

use crate::ast::{
    Admonition, Block, BlockKind, CodeBlock, Document, Inline, LinkDefinition, List, ListItem,
};
use crate::entities::unescape_and_decode;
use crate::line::NormalizedLine;
use crate::linkdef;
use crate::matcher::{BlockStart, MatcherSet};

const ADMONITION_KINDS: [&str; 5] = ["note", "tip", "important", "warning", "caution"];

/// Line-by-line block pass. Keeps a stack of open builders (index 0 is the
/// document), matches each incoming line against the open chain, opens and
/// closes builders, and collects link reference definitions on the side.
pub(crate) struct BlockEngine {
    matchers: MatcherSet,
    stack: Vec<Builder>,
    link_defs: HashMap<String, LinkDefinition>,
}

enum Builder {
    Document {
        blocks: Vec<Block>,
    },
    BlockQuote {
        blocks: Vec<Block>,
    },
    Admonition {
        fence_len: usize,
        kind: String,
        title: Option<String>,
        blocks: Vec<Block>,
    },
    List {
        ordered: bool,
        marker: u8,
        start: Option<u64>,
        tight: bool,
        items: Vec<ListItem>,
        pending_blank: bool,
    },
    ListItem {
        /// Required content indentation, relative to the offset produced by
        /// the ancestor chain.
        indent: usize,
        blocks: Vec<Block>,
        pending_blank: bool,
        loose: bool,
        blank_while_empty: bool,
    },
    Paragraph {
        lines: Vec<String>,
    },
    FencedCode {
        fence: u8,
        fence_len: usize,
        indent: usize,
        info: Option<String>,
        lang: Option<String>,
        lines: Vec<String>,
    },
    IndentedCode {
        lines: Vec<String>,
        last_nonblank: usize,
    },
    HtmlBlock {
        kind: u8,
        lines: Vec<String>,
    },
}

enum Continuation {
    Matched(usize),
    NotMatched,
    /// The line is a closing marker; the builder (and everything deeper)
    /// closes and the line is spent.
    Consumed,
}

#[derive(Clone, Copy, PartialEq)]
enum ScanMode {
    /// No open paragraph in play: the full matcher order applies.
    Normal,
    /// The line would interrupt a directly continued paragraph.
    Interrupt,
    /// An unmatched paragraph deeper in the chain may still absorb the line
    /// as a lazy continuation if nothing opens here.
    Lazy,
}

enum StartAction {
    ThematicBreak,
    AtxHeading { level: u8, text: String },
    BlockQuote { content: usize },
    ListItem { ordered: bool, marker: u8, start: u64, content: usize, indent: usize },
    FencedCode { fence: u8, fence_len: usize, indent: usize, info: Option<String>, lang: Option<String> },
    Admonition { fence_len: usize, kind: String, title: Option<String> },
    HtmlBlock { kind: u8 },
    IndentedCode,
    Paragraph,
}

enum Applied {
    /// A container opened; keep scanning the rest of the line inside it.
    Continue(usize),
    Done,
}

impl BlockEngine {
    pub(crate) fn new(matchers: MatcherSet) -> Self {
        Self {
            matchers,
            stack: vec![Builder::Document { blocks: Vec::new() }],
            link_defs: HashMap::new(),
        }
    }

    pub(crate) fn add_line(&mut self, line: &NormalizedLine) {
        // Continuation pass: walk the open chain outermost-first, letting
        // each builder consume its marker from the line.
        let mut offset = 0;
        let mut matched = 1;
        for i in 1..self.stack.len() {
            match self.try_continue(i, line, offset) {
                Continuation::Matched(next) => {
                    offset = next;
                    matched = i + 1;
                }
                Continuation::NotMatched => break,
                Continuation::Consumed => {
                    self.close_to(i);
                    return;
                }
            }
        }

        // A fully matched verbatim leaf takes the rest of the line as-is.
        if matched == self.stack.len()
            && matches!(
                self.stack.last(),
                Some(Builder::FencedCode { .. })
                    | Some(Builder::IndentedCode { .. })
                    | Some(Builder::HtmlBlock { .. })
            )
        {
            self.consume_verbatim(offset, line);
            return;
        }

        if rest_blank(line.slice(offset)) {
            self.close_to(matched);
            self.record_blank();
            return;
        }

        // Open new blocks until the line is spent or falls to text.
        loop {
            if rest_blank(line.slice(offset)) {
                return;
            }
            let tip_paragraph = matches!(self.stack.last(), Some(Builder::Paragraph { .. }));
            let direct = tip_paragraph && matched >= self.stack.len();
            let lazy = tip_paragraph && matched < self.stack.len();

            if direct {
                if let Some(level) = setext_underline_level(line.slice(offset)) {
                    if self.close_paragraph_for_setext(level) {
                        return;
                    }
                    matched = self.stack.len();
                    continue;
                }
            }

            let mode = if direct {
                ScanMode::Interrupt
            } else if lazy {
                ScanMode::Lazy
            } else {
                ScanMode::Normal
            };
            // A list marker that continues the deepest matched list is a
            // sibling item, not an interruption of the paragraph below it.
            let open_list = match self.stack.get(matched - 1) {
                Some(Builder::List { ordered, marker, .. }) => Some((*ordered, *marker)),
                _ => None,
            };
            match self.scan_block_start(line, offset, mode, open_list) {
                Some(action) => {
                    self.close_to(matched);
                    if matches!(self.stack.last(), Some(Builder::Paragraph { .. })) {
                        self.close_top();
                    }
                    match self.apply_start(action, offset, line) {
                        Applied::Continue(next) => {
                            offset = next;
                            matched = self.stack.len();
                        }
                        Applied::Done => return,
                    }
                }
                None => {
                    if direct || lazy {
                        let text = line.slice(offset).trim_start().to_string();
                        if let Some(Builder::Paragraph { lines }) = self.stack.last_mut() {
                            lines.push(text);
                        }
                    }
                    // Non-blank text with no matcher left (paragraph removed
                    // from the set) is dropped.
                    return;
                }
            }
        }
    }

    pub(crate) fn finish(mut self) -> (Document, HashMap<String, LinkDefinition>) {
        while self.stack.len() > 1 {
            self.close_top();
        }
        let document = match self.stack.pop() {
            Some(Builder::Document { blocks }) => Document { blocks },
            _ => Document { blocks: Vec::new() },
        };
        (document, self.link_defs)
    }

    fn try_continue(&mut self, i: usize, line: &NormalizedLine, offset: usize) -> Continuation {
        let rest = line.slice(offset);
        let admonition_close = match &self.stack[i] {
            Builder::Admonition { fence_len, .. } => {
                colon_fence_run(rest).filter(|run| run >= fence_len).map(|run| {
                    // A fence that also closes a deeper admonition belongs to
                    // the innermost one.
                    !self.stack[i + 1..].iter().any(|b| {
                        matches!(b, Builder::Admonition { fence_len, .. } if run >= *fence_len)
                    })
                })
            }
            _ => None,
        };
        match &mut self.stack[i] {
            Builder::Document { .. } => Continuation::Matched(offset),
            Builder::BlockQuote { .. } => match blockquote_marker(rest) {
                Some(consumed) => Continuation::Matched(offset + consumed),
                None => Continuation::NotMatched,
            },
            Builder::Admonition { .. } => match admonition_close {
                Some(true) => Continuation::Consumed,
                _ => Continuation::Matched(offset),
            },
            Builder::List { .. } => Continuation::Matched(offset),
            Builder::ListItem {
                indent,
                blocks,
                blank_while_empty,
                ..
            } => {
                if *blank_while_empty && blocks.is_empty() {
                    return Continuation::NotMatched;
                }
                if rest_blank(rest) {
                    return Continuation::Matched(offset);
                }
                let spaces = rest.bytes().take_while(|b| *b == b' ').count();
                if spaces >= *indent {
                    Continuation::Matched(offset + *indent)
                } else {
                    Continuation::NotMatched
                }
            }
            Builder::Paragraph { .. } => {
                if rest_blank(rest) {
                    Continuation::NotMatched
                } else {
                    Continuation::Matched(offset)
                }
            }
            Builder::FencedCode {
                fence, fence_len, ..
            } => {
                if is_fence_close(rest, *fence, *fence_len) {
                    Continuation::Consumed
                } else {
                    Continuation::Matched(offset)
                }
            }
            Builder::IndentedCode { .. } => {
                if rest_blank(rest) {
                    return Continuation::Matched(offset);
                }
                let spaces = rest.bytes().take_while(|b| *b == b' ').count();
                if spaces >= 4 {
                    Continuation::Matched(offset)
                } else {
                    Continuation::NotMatched
                }
            }
            Builder::HtmlBlock { kind, .. } => {
                if *kind >= 6 && rest_blank(rest) {
                    Continuation::NotMatched
                } else {
                    Continuation::Matched(offset)
                }
            }
        }
    }

    fn consume_verbatim(&mut self, offset: usize, line: &NormalizedLine) {
        if matches!(self.stack.last(), Some(Builder::HtmlBlock { .. })) {
            self.html_append(offset, line);
            return;
        }
        match self.stack.last_mut() {
            Some(Builder::FencedCode { indent, lines, .. }) => {
                let avail = line.slice(offset).bytes().take_while(|b| *b == b' ').count();
                let strip = (*indent).min(avail);
                lines.push(line.source_form(offset + strip));
            }
            Some(Builder::IndentedCode {
                lines,
                last_nonblank,
            }) => {
                lines.push(line.source_form(offset + 4));
                if !rest_blank(line.slice(offset)) {
                    *last_nonblank = lines.len() - 1;
                }
            }
            _ => {}
        }
    }

    fn html_append(&mut self, offset: usize, line: &NormalizedLine) {
        let text = line.source_form(offset);
        let done = match self.stack.last_mut() {
            Some(Builder::HtmlBlock { kind, lines }) => {
                lines.push(text);
                let kind = *kind;
                kind <= 5 && html_block_end(kind, lines.last().map(String::as_str).unwrap_or(""))
            }
            _ => false,
        };
        if done {
            self.close_top();
        }
    }

    fn scan_block_start(
        &self,
        line: &NormalizedLine,
        offset: usize,
        mode: ScanMode,
        open_list: Option<(bool, u8)>,
    ) -> Option<StartAction> {
        let s = line.slice(offset);
        let indent = s.bytes().take_while(|b| *b == b' ').count();
        if indent >= 4 {
            if mode != ScanMode::Normal {
                return None;
            }
            if self.matchers.enabled(BlockStart::IndentedCode) {
                return Some(StartAction::IndentedCode);
            }
            if self.matchers.enabled(BlockStart::Paragraph) {
                return Some(StartAction::Paragraph);
            }
            return None;
        }
        let rest = &s[indent..];
        // Both interruption and lazy continuation consult only the matchers
        // willing to interrupt a paragraph: a line that none of them claims
        // stays paragraph text, marker or not.
        let order: Vec<BlockStart> = match mode {
            ScanMode::Normal => self.matchers.matchers().to_vec(),
            _ => self.matchers.interrupters(BlockStart::Paragraph).to_vec(),
        };
        for m in order {
            let action = match m {
                BlockStart::ThematicBreak => {
                    if is_thematic_break_line(rest) {
                        Some(StartAction::ThematicBreak)
                    } else {
                        None
                    }
                }
                BlockStart::List => parse_list_marker(s).and_then(|mk| {
                    let continues = open_list == Some((mk.ordered, mk.marker));
                    if mode != ScanMode::Normal && !continues {
                        if mk.blank {
                            return None;
                        }
                        if mk.ordered && mk.start != 1 {
                            return None;
                        }
                    }
                    Some(StartAction::ListItem {
                        ordered: mk.ordered,
                        marker: mk.marker,
                        start: mk.start,
                        content: offset + mk.content_indent,
                        indent: mk.content_indent,
                    })
                }),
                BlockStart::AtxHeading => parse_atx_heading(rest)
                    .map(|(level, text)| StartAction::AtxHeading { level, text }),
                BlockStart::BlockQuote => blockquote_marker(s)
                    .map(|consumed| StartAction::BlockQuote { content: offset + consumed }),
                BlockStart::FencedCode => {
                    parse_fence_open(s).map(|(fence, fence_len, indent, info, lang)| {
                        StartAction::FencedCode { fence, fence_len, indent, info, lang }
                    })
                }
                BlockStart::Admonition => {
                    parse_admonition_open(rest).map(|(fence_len, kind, title)| {
                        StartAction::Admonition { fence_len, kind, title }
                    })
                }
                BlockStart::HtmlBlock => match_html_block_start(rest, mode != ScanMode::Normal)
                    .map(|kind| StartAction::HtmlBlock { kind }),
                // Indented code needs four columns, which never reach here;
                // link definitions are recognized at paragraph close.
                BlockStart::IndentedCode | BlockStart::LinkDefinition => None,
                BlockStart::Paragraph => {
                    if mode == ScanMode::Normal {
                        Some(StartAction::Paragraph)
                    } else {
                        None
                    }
                }
            };
            if action.is_some() {
                return action;
            }
        }
        None
    }

    fn apply_start(&mut self, action: StartAction, offset: usize, line: &NormalizedLine) -> Applied {
        if let StartAction::ListItem {
            ordered,
            marker,
            start,
            content,
            indent,
        } = action
        {
            let compatible = matches!(
                self.stack.last(),
                Some(Builder::List { ordered: o, marker: m, .. }) if *o == ordered && *m == marker
            );
            if compatible {
                if let Some(Builder::List {
                    pending_blank,
                    items,
                    tight,
                    ..
                }) = self.stack.last_mut()
                {
                    if *pending_blank && !items.is_empty() {
                        *tight = false;
                    }
                    *pending_blank = false;
                }
            } else {
                if matches!(self.stack.last(), Some(Builder::List { .. })) {
                    self.close_top();
                }
                self.note_child_on_item();
                self.stack.push(Builder::List {
                    ordered,
                    marker,
                    start: if ordered { Some(start) } else { None },
                    tight: true,
                    items: Vec::new(),
                    pending_blank: false,
                });
            }
            self.stack.push(Builder::ListItem {
                indent,
                blocks: Vec::new(),
                pending_blank: false,
                loose: false,
                blank_while_empty: false,
            });
            return Applied::Continue(content);
        }

        while matches!(self.stack.last(), Some(Builder::List { .. })) {
            self.close_top();
        }
        self.note_child_on_item();
        match action {
            StartAction::ThematicBreak => {
                self.append_block(Block::new(BlockKind::ThematicBreak));
                Applied::Done
            }
            StartAction::AtxHeading { level, text } => {
                let content = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Inline::text(text)]
                };
                self.append_block(Block::new(BlockKind::Heading { level, content }));
                Applied::Done
            }
            StartAction::BlockQuote { content } => {
                self.stack.push(Builder::BlockQuote { blocks: Vec::new() });
                Applied::Continue(content)
            }
            StartAction::FencedCode {
                fence,
                fence_len,
                indent,
                info,
                lang,
            } => {
                self.stack.push(Builder::FencedCode {
                    fence,
                    fence_len,
                    indent,
                    info,
                    lang,
                    lines: Vec::new(),
                });
                Applied::Done
            }
            StartAction::Admonition {
                fence_len,
                kind,
                title,
            } => {
                self.stack.push(Builder::Admonition {
                    fence_len,
                    kind,
                    title,
                    blocks: Vec::new(),
                });
                Applied::Done
            }
            StartAction::HtmlBlock { kind } => {
                self.stack.push(Builder::HtmlBlock {
                    kind,
                    lines: Vec::new(),
                });
                self.html_append(offset, line);
                Applied::Done
            }
            StartAction::IndentedCode => {
                self.stack.push(Builder::IndentedCode {
                    lines: vec![line.source_form(offset + 4)],
                    last_nonblank: 0,
                });
                Applied::Done
            }
            StartAction::Paragraph => {
                self.stack.push(Builder::Paragraph {
                    lines: vec![line.slice(offset).trim_start().to_string()],
                });
                Applied::Done
            }
            StartAction::ListItem { .. } => Applied::Done,
        }
    }

    fn close_paragraph_for_setext(&mut self, level: u8) -> bool {
        let extract = self.matchers.enabled(BlockStart::LinkDefinition);
        let lines = match self.stack.pop() {
            Some(Builder::Paragraph { lines }) => lines,
            Some(other) => {
                self.stack.push(other);
                return false;
            }
            None => return false,
        };
        let text = lines.join("\n");
        let rest = if extract {
            let out = linkdef::extract_definitions(&text);
            for (label, def) in out.defs {
                self.link_defs.entry(label).or_insert(def);
            }
            out.rest
        } else {
            text
        };
        let rest = rest.trim_end();
        if rest.is_empty() {
            return false;
        }
        self.append_block(Block::new(BlockKind::Heading {
            level,
            content: vec![Inline::text(rest)],
        }));
        true
    }

    fn record_blank(&mut self) {
        let item_content: Vec<bool> = self
            .stack
            .iter()
            .map(|b| matches!(b, Builder::ListItem { blocks, .. } if !blocks.is_empty()))
            .collect();
        for i in 0..self.stack.len() {
            match &mut self.stack[i] {
                Builder::List {
                    pending_blank,
                    items,
                    ..
                } => {
                    let open_item_content = item_content.get(i + 1).copied().unwrap_or(false);
                    if !items.is_empty() || open_item_content {
                        *pending_blank = true;
                    }
                }
                Builder::ListItem {
                    pending_blank,
                    blank_while_empty,
                    blocks,
                    ..
                } => {
                    if blocks.is_empty() {
                        *blank_while_empty = true;
                    } else {
                        *pending_blank = true;
                    }
                }
                _ => {}
            }
        }
    }

    fn note_child_on_item(&mut self) {
        if let Some(Builder::ListItem {
            pending_blank,
            loose,
            blocks,
            ..
        }) = self.stack.last_mut()
        {
            if *pending_blank {
                if !blocks.is_empty() {
                    *loose = true;
                }
                *pending_blank = false;
            }
        }
    }

    fn append_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Builder::Document { blocks })
            | Some(Builder::BlockQuote { blocks })
            | Some(Builder::Admonition { blocks, .. })
            | Some(Builder::ListItem { blocks, .. }) => blocks.push(block),
            _ => {}
        }
    }

    fn close_to(&mut self, target_len: usize) {
        while self.stack.len() > target_len.max(1) {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        let builder = match self.stack.pop() {
            Some(builder) => builder,
            None => return,
        };
        match builder {
            Builder::ListItem { blocks, loose, .. } => {
                if let Some(Builder::List { items, tight, .. }) = self.stack.last_mut() {
                    if loose {
                        *tight = false;
                    }
                    items.push(ListItem { blocks });
                }
            }
            other => {
                let extract = self.matchers.enabled(BlockStart::LinkDefinition);
                if let Some(block) = finish_block(other, &mut self.link_defs, extract) {
                    self.append_block(block);
                }
            }
        }
    }
}

fn finish_block(
    builder: Builder,
    link_defs: &mut HashMap<String, LinkDefinition>,
    extract: bool,
) -> Option<Block> {
    let kind = match builder {
        Builder::Document { .. } | Builder::ListItem { .. } => return None,
        Builder::BlockQuote { blocks } => BlockKind::BlockQuote { blocks },
        Builder::Admonition {
            kind, title, blocks, ..
        } => BlockKind::Admonition(Admonition {
            kind,
            title: title.map(|t| vec![Inline::text(t)]),
            blocks,
        }),
        Builder::List {
            ordered,
            marker,
            start,
            tight,
            items,
            ..
        } => BlockKind::List(List {
            ordered,
            marker,
            start,
            tight,
            items,
        }),
        Builder::Paragraph { lines } => {
            let text = lines.join("\n");
            let rest = if extract {
                let out = linkdef::extract_definitions(&text);
                for (label, def) in out.defs {
                    link_defs.entry(label).or_insert(def);
                }
                out.rest
            } else {
                text
            };
            let rest = rest.trim_end();
            if rest.is_empty() {
                return None;
            }
            BlockKind::Paragraph {
                content: vec![Inline::text(rest)],
            }
        }
        Builder::FencedCode {
            info, lang, lines, ..
        } => {
            let text = if lines.is_empty() {
                String::new()
            } else {
                let mut t = lines.join("\n");
                t.push('\n');
                t
            };
            BlockKind::CodeBlock(CodeBlock {
                fenced: true,
                lang,
                info,
                text,
            })
        }
        Builder::IndentedCode {
            lines,
            last_nonblank,
        } => {
            let mut text = lines[..=last_nonblank.min(lines.len().saturating_sub(1))].join("\n");
            text.push('\n');
            BlockKind::CodeBlock(CodeBlock {
                fenced: false,
                lang: None,
                info: None,
                text,
            })
        }
        Builder::HtmlBlock { lines, .. } => BlockKind::HtmlBlock {
            raw: lines.join("\n"),
        },
    };
    Some(Block::new(kind))
}

fn rest_blank(s: &str) -> bool {
    s.bytes().all(|b| b == b' ')
}

fn blockquote_marker(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let indent = bytes.iter().take_while(|b| **b == b' ').count();
    if indent > 3 || bytes.get(indent) != Some(&b'>') {
        return None;
    }
    let mut consumed = indent + 1;
    if bytes.get(consumed) == Some(&b' ') {
        consumed += 1;
    }
    Some(consumed)
}

fn colon_fence_run(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let indent = bytes.iter().take_while(|b| **b == b' ').count();
    if indent > 3 {
        return None;
    }
    let run = bytes[indent..].iter().take_while(|b| **b == b':').count();
    if run >= 3 && rest_blank(&s[indent + run..]) {
        Some(run)
    } else {
        None
    }
}

struct ListMarker {
    ordered: bool,
    marker: u8,
    start: u64,
    content_indent: usize,
    blank: bool,
}

fn parse_list_marker(s: &str) -> Option<ListMarker> {
    let bytes = s.as_bytes();
    let indent = bytes.iter().take_while(|b| **b == b' ').count();
    if indent > 3 {
        return None;
    }
    let mut pos = indent;
    let (ordered, marker, start) = match bytes.get(pos)? {
        b @ (b'-' | b'+' | b'*') => {
            pos += 1;
            (false, *b, 0)
        }
        b'0'..=b'9' => {
            let digits_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos - digits_start > 9 {
                return None;
            }
            let delim = match bytes.get(pos)? {
                b @ (b'.' | b')') => *b,
                _ => return None,
            };
            let start: u64 = s[digits_start..pos].parse().ok()?;
            pos += 1;
            (true, delim, start)
        }
        _ => return None,
    };
    if pos == bytes.len() {
        return Some(ListMarker {
            ordered,
            marker,
            start,
            content_indent: pos + 1,
            blank: true,
        });
    }
    if bytes[pos] != b' ' {
        return None;
    }
    let spaces = bytes[pos..].iter().take_while(|b| **b == b' ').count();
    let blank = pos + spaces == bytes.len();
    let content_indent = if blank || spaces > 4 { pos + 1 } else { pos + spaces };
    Some(ListMarker {
        ordered,
        marker,
        start,
        content_indent,
        blank,
    })
}

fn is_thematic_break_line(s: &str) -> bool {
    let mut ch = None;
    let mut count = 0;
    for b in s.bytes() {
        match b {
            b' ' | b'\t' => {}
            b'-' | b'_' | b'*' => {
                match ch {
                    None => ch = Some(b),
                    Some(c) if c != b => return false,
                    _ => {}
                }
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

/// Level 1 for a run of `=`, level 2 for two or more `-`.
fn setext_underline_level(s: &str) -> Option<u8> {
    let indent = s.bytes().take_while(|b| *b == b' ').count();
    if indent > 3 {
        return None;
    }
    let t = s.trim();
    if !t.is_empty() && t.bytes().all(|b| b == b'=') {
        return Some(1);
    }
    if t.len() >= 2 && t.bytes().all(|b| b == b'-') {
        return Some(2);
    }
    None
}

fn parse_atx_heading(s: &str) -> Option<(u8, String)> {
    let bytes = s.as_bytes();
    let level = bytes.iter().take_while(|b| **b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let text = match bytes.get(level) {
        None => "",
        Some(b' ') => s[level..].trim(),
        Some(_) => return None,
    };
    // A trailing run of `#` is stripped only when whitespace precedes it.
    let stripped = text.trim_end_matches('#');
    let text = if stripped.len() != text.len() {
        if stripped.is_empty() {
            ""
        } else if stripped.ends_with(' ') {
            stripped.trim_end()
        } else {
            text
        }
    } else {
        text
    };
    Some((level as u8, text.to_string()))
}

type FenceOpen = (u8, usize, usize, Option<String>, Option<String>);

fn parse_fence_open(s: &str) -> Option<FenceOpen> {
    let bytes = s.as_bytes();
    let indent = bytes.iter().take_while(|b| **b == b' ').count();
    if indent > 3 {
        return None;
    }
    let fence = match bytes.get(indent)? {
        b @ (b'`' | b'~') => *b,
        _ => return None,
    };
    let fence_len = bytes[indent..].iter().take_while(|b| **b == fence).count();
    if fence_len < 3 {
        return None;
    }
    let info_raw = s[indent + fence_len..].trim();
    if fence == b'`' && info_raw.contains('`') {
        return None;
    }
    let info = if info_raw.is_empty() {
        None
    } else {
        Some(unescape_and_decode(info_raw))
    };
    let lang = info
        .as_ref()
        .and_then(|i| i.split_whitespace().next())
        .map(String::from);
    Some((fence, fence_len, indent, info, lang))
}

fn is_fence_close(s: &str, fence: u8, fence_len: usize) -> bool {
    let bytes = s.as_bytes();
    let indent = bytes.iter().take_while(|b| **b == b' ').count();
    if indent > 3 {
        return false;
    }
    let run = bytes[indent..].iter().take_while(|b| **b == fence).count();
    run >= fence_len && rest_blank(&s[indent + run..])
}

fn parse_admonition_open(s: &str) -> Option<(usize, String, Option<String>)> {
    let bytes = s.as_bytes();
    let fence_len = bytes.iter().take_while(|b| **b == b':').count();
    if fence_len < 3 {
        return None;
    }
    let after = s[fence_len..].trim();
    let mut parts = after.splitn(2, char::is_whitespace);
    let word = parts.next()?;
    if word.is_empty() {
        return None;
    }
    let kind = word.to_ascii_lowercase();
    if !ADMONITION_KINDS.contains(&kind.as_str()) {
        return None;
    }
    let title = parts
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);
    Some((fence_len, kind, title))
}

const HTML_BLOCK_TAGS: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

/// The seven CommonMark HTML block kinds. Kind 7 (a complete tag alone on
/// the line) never interrupts a paragraph.
fn match_html_block_start(s: &str, paragraph_open: bool) -> Option<u8> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let lower = s.to_ascii_lowercase();
    for tag in ["<script", "<pre", "<style", "<textarea"] {
        if lower.starts_with(tag) {
            match bytes.get(tag.len()) {
                None | Some(b' ') | Some(b'\t') | Some(b'>') => return Some(1),
                _ => {}
            }
        }
    }
    if s.starts_with("<!--") {
        return Some(2);
    }
    if s.starts_with("<?") {
        return Some(3);
    }
    if s.starts_with("<![CDATA[") {
        return Some(5);
    }
    if s.starts_with("<!") && bytes.get(2).is_some_and(|b| b.is_ascii_alphabetic()) {
        return Some(4);
    }
    let name_start = if bytes.get(1) == Some(&b'/') { 2 } else { 1 };
    let name_end = name_start
        + lower[name_start..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();
    if name_end > name_start {
        let name = &lower[name_start..name_end];
        if HTML_BLOCK_TAGS.contains(&name) {
            let tail = &bytes[name_end..];
            let ok = match tail.first() {
                None | Some(b' ') | Some(b'\t') | Some(b'>') => true,
                Some(b'/') => tail.get(1) == Some(&b'>'),
                _ => false,
            };
            if ok {
                return Some(6);
            }
        }
    }
    if !paragraph_open {
        let consumed = crate::inline::scan_html_open_tag(bytes)
            .or_else(|| crate::inline::scan_html_close_tag(bytes));
        if let Some(consumed) = consumed {
            if rest_blank(&s[consumed..]) {
                return Some(7);
            }
        }
    }
    None
}

fn html_block_end(kind: u8, line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    match kind {
        1 => ["</script>", "</pre>", "</style>", "</textarea>"]
            .iter()
            .any(|t| lower.contains(t)),
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}
