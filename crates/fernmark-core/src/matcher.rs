/// Block-start matchers, in the order the engine consults them. Precedence is
/// the position in a `MatcherSet`, not anything implied by this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStart {
    ThematicBreak,
    List,
    AtxHeading,
    BlockQuote,
    FencedCode,
    Admonition,
    HtmlBlock,
    IndentedCode,
    LinkDefinition,
    Paragraph,
}

/// The registry the block engine is constructed with: an explicit precedence
/// order plus, per interruptible block type, the matchers allowed to cut an
/// open block short. Both are plain data so a caller can run with a reduced
/// set and the engine never hard-codes an ordering.
#[derive(Clone, Debug)]
pub struct MatcherSet {
    order: Vec<BlockStart>,
    interrupts: Vec<(BlockStart, Vec<BlockStart>)>,
}

impl MatcherSet {
    /// The full built-in set. Thematic break outranks list, list outranks
    /// heading, and so on down to the paragraph catch-all.
    pub fn standard() -> Self {
        Self::new(vec![
            BlockStart::ThematicBreak,
            BlockStart::List,
            BlockStart::AtxHeading,
            BlockStart::BlockQuote,
            BlockStart::FencedCode,
            BlockStart::Admonition,
            BlockStart::HtmlBlock,
            BlockStart::IndentedCode,
            BlockStart::LinkDefinition,
            BlockStart::Paragraph,
        ])
    }

    /// Builds a set from an explicit precedence order. The interruption table
    /// is derived by filtering the built-in capabilities down to the matchers
    /// actually present.
    pub fn new(order: Vec<BlockStart>) -> Self {
        let paragraph_interrupters = [
            BlockStart::ThematicBreak,
            BlockStart::List,
            BlockStart::AtxHeading,
            BlockStart::BlockQuote,
            BlockStart::FencedCode,
            BlockStart::Admonition,
            BlockStart::HtmlBlock,
        ];
        let filtered: Vec<BlockStart> = order
            .iter()
            .copied()
            .filter(|m| paragraph_interrupters.contains(m))
            .collect();
        let interrupts = vec![(BlockStart::Paragraph, filtered)];
        Self { order, interrupts }
    }

    pub fn matchers(&self) -> &[BlockStart] {
        &self.order
    }

    pub fn enabled(&self, matcher: BlockStart) -> bool {
        self.order.contains(&matcher)
    }

    /// Matchers allowed to interrupt an open block of the given type, in
    /// precedence order. Types absent from the table cannot be interrupted.
    pub fn interrupters(&self, target: BlockStart) -> &[BlockStart] {
        self.interrupts
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for MatcherSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Inline handlers, keyed by the trigger byte the scanner dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineTrigger {
    Emphasis,
    CodeSpan,
    AngleBracket,
    Entity,
    BracketOpen,
    Bang,
    BracketClose,
}

/// Trigger-byte dispatch table for the inline scanner. Bytes without an entry
/// are copied through as literal text.
#[derive(Clone)]
pub struct HandlerSet {
    table: [Option<InlineTrigger>; 256],
}

impl HandlerSet {
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.register(b'*', InlineTrigger::Emphasis);
        set.register(b'_', InlineTrigger::Emphasis);
        set.register(b'`', InlineTrigger::CodeSpan);
        set.register(b'<', InlineTrigger::AngleBracket);
        set.register(b'&', InlineTrigger::Entity);
        set.register(b'[', InlineTrigger::BracketOpen);
        set.register(b'!', InlineTrigger::Bang);
        set.register(b']', InlineTrigger::BracketClose);
        set
    }

    pub fn empty() -> Self {
        Self { table: [None; 256] }
    }

    pub fn register(&mut self, byte: u8, trigger: InlineTrigger) {
        self.table[byte as usize] = Some(trigger);
    }

    pub fn remove(&mut self, byte: u8) {
        self.table[byte as usize] = None;
    }

    pub fn lookup(&self, byte: u8) -> Option<InlineTrigger> {
        self.table[byte as usize]
    }
}

impl Default for HandlerSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let triggers: Vec<(char, InlineTrigger)> = self
            .table
            .iter()
            .enumerate()
            .filter_map(|(b, t)| t.map(|t| (b as u8 as char, t)))
            .collect();
        f.debug_struct("HandlerSet").field("triggers", &triggers).finish()
    }
}
