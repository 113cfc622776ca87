use std::collections::HashMap;
use std::io::BufRead;

use crate::ast::{Block, BlockKind, Document, Inline, InlineKind, InlineSeq, LinkDefinition};
use crate::block::BlockEngine;
use crate::error::ParseError;
use crate::inline::parse_inlines;
use crate::line::{NormalizedLine, normalize_source};
use crate::matcher::{HandlerSet, MatcherSet};

/// A parsed document plus the link reference table collected on the way.
pub struct ParseResult {
    pub document: Document,
    pub link_defs: HashMap<String, LinkDefinition>,
}

/// Two-pass parser: a block pass over lines, then an inline pass over each
/// leaf once the link reference table is complete. All state lives in one
/// invocation; a `Parser` value itself is just configuration.
pub struct Parser {
    matchers: MatcherSet,
    handlers: HandlerSet,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            matchers: MatcherSet::standard(),
            handlers: HandlerSet::standard(),
        }
    }

    pub fn with_matchers(mut self, matchers: MatcherSet) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerSet) -> Self {
        self.handlers = handlers;
        self
    }

    /// Parses a fully buffered source. Infallible: malformed markup degrades
    /// to literal text instead of erroring.
    pub fn parse(&self, source: &str) -> ParseResult {
        let mut engine = BlockEngine::new(self.matchers.clone());
        for line in normalize_source(source) {
            engine.add_line(&line);
        }
        self.finish(engine)
    }

    /// Parses lines streamed from a reader. I/O failure is the only error.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<ParseResult, ParseError> {
        let mut engine = BlockEngine::new(self.matchers.clone());
        for line in reader.lines() {
            let raw = line?;
            engine.add_line(&NormalizedLine::new(&raw));
        }
        Ok(self.finish(engine))
    }

    fn finish(&self, engine: BlockEngine) -> ParseResult {
        let (mut document, link_defs) = engine.finish();
        for block in &mut document.blocks {
            resolve_block(block, &link_defs, &self.handlers);
        }
        ParseResult {
            document,
            link_defs,
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses with the standard matcher and handler sets.
pub fn parse(source: &str) -> ParseResult {
    Parser::new().parse(source)
}

pub fn parse_reader(reader: impl BufRead) -> Result<ParseResult, ParseError> {
    Parser::new().parse_reader(reader)
}

fn resolve_block(
    block: &mut Block,
    link_defs: &HashMap<String, LinkDefinition>,
    handlers: &HandlerSet,
) {
    match &mut block.kind {
        BlockKind::Paragraph { content } | BlockKind::Heading { content, .. } => {
            resolve_inlines(content, link_defs, handlers);
        }
        BlockKind::BlockQuote { blocks } => {
            for child in blocks {
                resolve_block(child, link_defs, handlers);
            }
        }
        BlockKind::List(list) => {
            for item in &mut list.items {
                for child in &mut item.blocks {
                    resolve_block(child, link_defs, handlers);
                }
            }
        }
        BlockKind::Admonition(adm) => {
            if let Some(title) = &mut adm.title {
                resolve_inlines(title, link_defs, handlers);
            }
            for child in &mut adm.blocks {
                resolve_block(child, link_defs, handlers);
            }
        }
        BlockKind::CodeBlock(_) | BlockKind::HtmlBlock { .. } | BlockKind::ThematicBreak => {}
    }
}

/// The block pass stages a leaf's accumulated raw text as a single text
/// node; the inline pass replaces it with the real inline tree.
fn resolve_inlines(
    content: &mut InlineSeq,
    link_defs: &HashMap<String, LinkDefinition>,
    handlers: &HandlerSet,
) {
    let raw = match content.as_slice() {
        [Inline {
            kind: InlineKind::Text(raw),
        }] => raw.clone(),
        _ => return,
    };
    *content = parse_inlines(&raw, link_defs, handlers);
}
