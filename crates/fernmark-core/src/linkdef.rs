use crate::ast::LinkDefinition;
use crate::entities::{percent_encode_url, unescape_and_decode};

/// Normalizes a link label for table lookup: case-fold, collapse interior
/// whitespace runs to a single space, trim the ends. An empty result means
/// the label is invalid.
pub fn normalize_link_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_space = false;
    for ch in label.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
    }
    out
}

pub(crate) struct ExtractedDefinitions {
    pub defs: Vec<(String, LinkDefinition)>,
    /// Paragraph text left over after the leading definitions.
    pub rest: String,
}

/// Greedily consumes link reference definitions from the front of would-be
/// paragraph text. Anything that fails to parse as a definition, and
/// everything after it, stays paragraph content.
pub(crate) fn extract_definitions(text: &str) -> ExtractedDefinitions {
    let mut defs = Vec::new();
    let mut pos = 0;
    while let Some((label, def, end)) = parse_definition(text, pos) {
        defs.push((label, def));
        pos = end;
    }
    ExtractedDefinitions {
        defs,
        rest: text[pos..].to_string(),
    }
}

fn parse_definition(text: &str, start: usize) -> Option<(String, LinkDefinition, usize)> {
    let bytes = text.as_bytes();
    let mut pos = start;
    let mut spaces = 0;
    while spaces < 3 && bytes.get(pos) == Some(&b' ') {
        pos += 1;
        spaces += 1;
    }
    if bytes.get(pos) != Some(&b'[') {
        return None;
    }
    pos += 1;
    let label_start = pos;
    loop {
        if pos - label_start > 999 {
            return None;
        }
        match bytes.get(pos)? {
            b'\\' if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_punctuation() => pos += 2,
            b']' => break,
            b'[' => return None,
            b'\n' => {
                if rest_of_line_blank(bytes, pos + 1) {
                    return None;
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    let label = normalize_link_label(&text[label_start..pos]);
    if label.is_empty() {
        return None;
    }
    pos += 1;
    if bytes.get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;
    pos = skip_spaces_one_newline(bytes, pos)?;
    let (dest_raw, used) = parse_destination(&text[pos..])?;
    pos += used;

    // Trailing content of the destination's line, used when a title either
    // is absent or fails to end its own line cleanly.
    let mut dest_line_end = pos;
    while bytes.get(dest_line_end) == Some(&b' ') {
        dest_line_end += 1;
    }
    let dest_line_clean =
        dest_line_end == bytes.len() || bytes.get(dest_line_end) == Some(&b'\n');

    let mut title = None;
    let mut end = None;
    let mut tpos = pos;
    while bytes.get(tpos) == Some(&b' ') {
        tpos += 1;
    }
    if bytes.get(tpos) == Some(&b'\n') {
        tpos += 1;
        while bytes.get(tpos) == Some(&b' ') {
            tpos += 1;
        }
    }
    if tpos > pos {
        if let Some((raw, used)) = parse_title(&text[tpos..]) {
            let mut after = tpos + used;
            while bytes.get(after) == Some(&b' ') {
                after += 1;
            }
            if after == bytes.len() || bytes.get(after) == Some(&b'\n') {
                title = Some(unescape_and_decode(raw));
                end = Some(after);
            }
        }
    }
    let mut end = match end {
        Some(end) => end,
        None if dest_line_clean => dest_line_end,
        None => return None,
    };
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }
    let url = percent_encode_url(&unescape_and_decode(dest_raw));
    Some((label, LinkDefinition { url, title }, end))
}

fn rest_of_line_blank(bytes: &[u8], mut pos: usize) -> bool {
    while let Some(b) = bytes.get(pos) {
        match b {
            b' ' => pos += 1,
            b'\n' => return true,
            _ => return false,
        }
    }
    true
}

/// Skips spaces and at most one newline. Fails on a blank line.
fn skip_spaces_one_newline(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while bytes.get(pos) == Some(&b' ') {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'\n') {
        pos += 1;
        while bytes.get(pos) == Some(&b' ') {
            pos += 1;
        }
        if bytes.get(pos) == Some(&b'\n') {
            return None;
        }
    }
    Some(pos)
}

/// Parses a link destination at the start of `text`: either `<...>` (no
/// newlines or unescaped angle brackets inside) or a bare destination with
/// balanced parentheses. Returns the raw destination and bytes consumed.
pub(crate) fn parse_destination(text: &str) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() == Some(&b'<') {
        let mut pos = 1;
        while let Some(b) = bytes.get(pos) {
            match b {
                b'\\' if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_punctuation() => {
                    pos += 2
                }
                b'>' => return Some((&text[1..pos], pos + 1)),
                b'<' | b'\n' => return None,
                _ => pos += 1,
            }
        }
        return None;
    }
    let mut pos = 0;
    let mut depth = 0usize;
    while let Some(b) = bytes.get(pos) {
        match b {
            b'\\' if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_punctuation() => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                pos += 1;
            }
            b if b.is_ascii_control() || *b == b' ' => break,
            _ => pos += 1,
        }
    }
    if pos == 0 || depth != 0 {
        return None;
    }
    Some((&text[..pos], pos))
}

/// Parses a link title at the start of `text`: `"..."`, `'...'`, or `(...)`.
/// May span lines but not a blank line. Returns the raw inner text and bytes
/// consumed including the quotes.
pub(crate) fn parse_title(text: &str) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let (open, close) = match bytes.first()? {
        b'"' => (b'"', b'"'),
        b'\'' => (b'\'', b'\''),
        b'(' => (b'(', b')'),
        _ => return None,
    };
    let mut pos = 1;
    while let Some(b) = bytes.get(pos) {
        match *b {
            b'\\' if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_punctuation() => pos += 2,
            b if b == close => return Some((&text[1..pos], pos + 1)),
            b if b == open => return None,
            b'\n' => {
                if rest_of_line_blank(bytes, pos + 1) {
                    return None;
                }
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    None
}
