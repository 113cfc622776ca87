mod ast;
mod block;
mod emit;
mod entities;
mod error;
mod inline;
mod line;
mod linkdef;
mod matcher;
mod parser;

pub use ast::{
    Admonition, Block, BlockKind, CodeBlock, Document, Inline, InlineKind, InlineSeq,
    LinkDefinition, List, ListItem,
};
pub use emit::{emit_html, emit_html_sanitized};
pub use error::ParseError;
pub use linkdef::normalize_link_label;
pub use matcher::{BlockStart, HandlerSet, InlineTrigger, MatcherSet};
pub use parser::{ParseResult, Parser, parse, parse_reader};
