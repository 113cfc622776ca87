pub type InlineSeq = Vec<Inline>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
}

impl Block {
    pub(crate) fn new(kind: BlockKind) -> Self {
        Self { kind }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    Paragraph {
        content: InlineSeq,
    },
    Heading {
        level: u8,
        content: InlineSeq,
    },
    BlockQuote {
        blocks: Vec<Block>,
    },
    List(List),
    CodeBlock(CodeBlock),
    HtmlBlock {
        raw: String,
    },
    ThematicBreak,
    Admonition(Admonition),
}

#[derive(Clone, Debug, PartialEq)]
pub struct List {
    pub ordered: bool,
    /// Bullet character for unordered lists, delimiter (`.` or `)`) for
    /// ordered ones. A later line continues the list only if this matches.
    pub marker: u8,
    pub start: Option<u64>,
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CodeBlock {
    pub fenced: bool,
    /// First whitespace-delimited word of the info string, if any.
    pub lang: Option<String>,
    /// Full info string after escape and entity resolution (fenced only).
    pub info: Option<String>,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Admonition {
    pub kind: String,
    pub title: Option<InlineSeq>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Inline {
    pub kind: InlineKind,
}

impl Inline {
    pub(crate) fn new(kind: InlineKind) -> Self {
        Self { kind }
    }

    pub(crate) fn text(value: impl Into<String>) -> Self {
        Self {
            kind: InlineKind::Text(value.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InlineKind {
    Text(String),
    Emph(InlineSeq),
    Strong(InlineSeq),
    CodeSpan(String),
    SoftBreak,
    HardBreak,
    Link {
        url: String,
        title: Option<String>,
        children: InlineSeq,
    },
    Image {
        url: String,
        title: Option<String>,
        alt: InlineSeq,
    },
    HtmlSpan {
        raw: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkDefinition {
    pub url: String,
    pub title: Option<String>,
}
