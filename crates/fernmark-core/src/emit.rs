use std::collections::{HashMap, HashSet};

use ammonia::Builder;

use crate::ast::{Block, BlockKind, Document, Inline, InlineKind, List};

/// Emits raw, un-sanitized HTML for a parsed document.
pub fn emit_html(document: &Document) -> String {
    // Deterministic formatting: 2-space indentation and LF newlines.
    let mut writer = HtmlWriter::new();
    for block in &document.blocks {
        emit_block(&mut writer, block, false);
    }
    writer.finish()
}

/// Emits HTML and sanitizes it through an allow-list. Raw HTML blocks and
/// spans survive only as far as the list permits.
pub fn emit_html_sanitized(document: &Document) -> String {
    let raw_html = emit_html(document);

    let tags: HashSet<&'static str> = [
        "a",
        "blockquote",
        "br",
        "code",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "img",
        "li",
        "ol",
        "p",
        "pre",
        "strong",
        "ul",
    ]
    .iter()
    .copied()
    .collect();

    let mut generic_attributes: HashSet<&'static str> = HashSet::new();
    generic_attributes.insert("class");

    let mut tag_attributes = HashMap::new();
    tag_attributes.insert("a", ["href", "title"].iter().copied().collect());
    tag_attributes.insert("img", ["alt", "src", "title"].iter().copied().collect());
    tag_attributes.insert("ol", ["start"].iter().copied().collect());

    Builder::default()
        .tags(tags)
        .generic_attributes(generic_attributes)
        .tag_attributes(tag_attributes)
        .clean(&raw_html)
        .to_string()
}

struct HtmlWriter {
    out: String,
    indent: usize,
}

impl HtmlWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(line);
        self.out.push('\n');
    }

    /// Verbatim output for preformatted and raw-HTML content, where
    /// indentation would change meaning.
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn finish(mut self) -> String {
        if self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out
    }
}

fn emit_block(writer: &mut HtmlWriter, block: &Block, tight: bool) {
    match &block.kind {
        BlockKind::Paragraph { content } => {
            let inner = render_inlines(content);
            if tight {
                writer.line(&inner);
            } else {
                writer.line(&format!("<p>{}</p>", inner));
            }
        }
        BlockKind::Heading { level, content } => {
            writer.line(&format!(
                "<h{}>{}</h{}>",
                level,
                render_inlines(content),
                level
            ));
        }
        BlockKind::BlockQuote { blocks } => {
            writer.line("<blockquote>");
            writer.indent += 1;
            for child in blocks {
                emit_block(writer, child, false);
            }
            writer.indent -= 1;
            writer.line("</blockquote>");
        }
        BlockKind::List(list) => emit_list(writer, list),
        BlockKind::CodeBlock(code) => {
            let class = match &code.lang {
                Some(lang) => format!(" class=\"language-{}\"", escape_attr(lang)),
                None => String::new(),
            };
            writer.raw(&format!("<pre><code{}>", class));
            writer.raw(&escape_html(&code.text));
            writer.raw("</code></pre>\n");
        }
        BlockKind::HtmlBlock { raw } => {
            writer.raw(raw);
            writer.raw("\n");
        }
        BlockKind::ThematicBreak => writer.line("<hr />"),
        BlockKind::Admonition(adm) => {
            writer.line(&format!(
                "<div class=\"admonition {}\">",
                escape_attr(&adm.kind)
            ));
            writer.indent += 1;
            let title = match &adm.title {
                Some(title) => render_inlines(title),
                None => escape_html(&capitalize(&adm.kind)),
            };
            writer.line(&format!("<p class=\"admonition-title\">{}</p>", title));
            for child in &adm.blocks {
                emit_block(writer, child, false);
            }
            writer.indent -= 1;
            writer.line("</div>");
        }
    }
}

fn emit_list(writer: &mut HtmlWriter, list: &List) {
    let open = if list.ordered {
        match list.start {
            Some(start) if start != 1 => format!("<ol start=\"{}\">", start),
            _ => "<ol>".to_string(),
        }
    } else {
        "<ul>".to_string()
    };
    writer.line(&open);
    writer.indent += 1;
    for item in &list.items {
        // Tight items inline a single paragraph directly into the <li>.
        if list.tight && item.blocks.len() == 1 {
            if let BlockKind::Paragraph { content } = &item.blocks[0].kind {
                writer.line(&format!("<li>{}</li>", render_inlines(content)));
                continue;
            }
        }
        if item.blocks.is_empty() {
            writer.line("<li></li>");
            continue;
        }
        writer.line("<li>");
        writer.indent += 1;
        for child in &item.blocks {
            emit_block(writer, child, list.tight);
        }
        writer.indent -= 1;
        writer.line("</li>");
    }
    writer.indent -= 1;
    writer.line(if list.ordered { "</ol>" } else { "</ul>" });
}

fn render_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match &inline.kind {
            InlineKind::Text(text) => out.push_str(&escape_html(text)),
            InlineKind::Emph(children) => {
                out.push_str("<em>");
                out.push_str(&render_inlines(children));
                out.push_str("</em>");
            }
            InlineKind::Strong(children) => {
                out.push_str("<strong>");
                out.push_str(&render_inlines(children));
                out.push_str("</strong>");
            }
            InlineKind::CodeSpan(code) => {
                out.push_str("<code>");
                out.push_str(&escape_html(code));
                out.push_str("</code>");
            }
            InlineKind::SoftBreak => out.push('\n'),
            InlineKind::HardBreak => out.push_str("<br />\n"),
            InlineKind::Link {
                url,
                title,
                children,
            } => {
                out.push_str(&format!("<a href=\"{}\"", escape_url_attr(url)));
                if let Some(title) = title {
                    out.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                out.push('>');
                out.push_str(&render_inlines(children));
                out.push_str("</a>");
            }
            InlineKind::Image { url, title, alt } => {
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"",
                    escape_url_attr(url),
                    escape_attr(&flatten_text(alt))
                ));
                if let Some(title) = title {
                    out.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                out.push_str(" />");
            }
            InlineKind::HtmlSpan { raw } => out.push_str(raw),
        }
    }
    out
}

/// Plain-text projection of inline content, used for image alt attributes.
fn flatten_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match &inline.kind {
            InlineKind::Text(text) => out.push_str(text),
            InlineKind::CodeSpan(code) => out.push_str(code),
            InlineKind::SoftBreak | InlineKind::HardBreak => out.push(' '),
            InlineKind::Emph(children) | InlineKind::Strong(children) => {
                out.push_str(&flatten_text(children))
            }
            InlineKind::Link { children, .. } => out.push_str(&flatten_text(children)),
            InlineKind::Image { alt, .. } => out.push_str(&flatten_text(alt)),
            InlineKind::HtmlSpan { .. } => {}
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_url_attr(text: &str) -> String {
    let mut encoded = String::new();
    for &byte in text.as_bytes() {
        match byte {
            b' ' => encoded.push_str("%20"),
            b'\\' => encoded.push_str("%5C"),
            0x00..=0x1F | 0x7F..=0xFF => {
                encoded.push_str(&format!("%{:02X}", byte));
            }
            _ => encoded.push(byte as char),
        }
    }
    escape_attr(&encoded)
}

#[cfg(test)]
mod tests {
    use super::{escape_attr, escape_html, escape_url_attr};

    #[test]
    fn html_escaping() {
        assert_eq!(escape_html("a<b&c>d"), "a&lt;b&amp;c&gt;d");
        assert_eq!(escape_attr("a\"b"), "a&quot;b");
    }

    #[test]
    fn url_attr_escaping() {
        assert_eq!(escape_url_attr("/a b"), "/a%20b");
        assert_eq!(escape_url_attr("/x?a=1&b=2"), "/x?a=1&amp;b=2");
    }
}
