use std::fmt;

/// Stable identifier of a node inside one [`Document`](super::Document).
///
/// Ids are handed out in creation order and never reused, so a `NodeId`
/// held by a selection or a batch stays valid across renames, undo and redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Heading level, always within `1..=6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub fn new(level: u8) -> Option<Self> {
        (1..=6).contains(&level).then_some(Self(level))
    }

    /// Clamp any level into `1..=6`
    pub fn clamped(level: u8) -> Self {
        Self(level.clamp(1, 6))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// The type of a leaf block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Plain paragraph, the default block
    Paragraph,
    Heading(HeadingLevel),
    ListItem,
    CodeBlock {
        /// Info string of a fenced block (`rust` in ```` ```rust ````)
        language: Option<String>,
    },
}

impl BlockType {
    /// Name used by the schema to identify this block type.
    pub fn schema_name(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading(level) => match level.get() {
                1 => "heading1",
                2 => "heading2",
                3 => "heading3",
                4 => "heading4",
                5 => "heading5",
                _ => "heading6",
            },
            BlockType::ListItem => "listItem",
            BlockType::CodeBlock { .. } => "codeBlock",
        }
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self, BlockType::Paragraph)
    }
}

/// What a node in the document tree is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root. Exactly one per document.
    Root,
    /// A block quote container holding blocks and nested quotes.
    BlockQuote,
    /// A leaf block carrying text.
    Block(BlockType),
}

impl NodeKind {
    pub fn schema_name(&self) -> &'static str {
        match self {
            NodeKind::Root => "$root",
            NodeKind::BlockQuote => "blockQuote",
            NodeKind::Block(block_type) => block_type.schema_name(),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::BlockQuote)
    }

    pub fn block_type(&self) -> Option<&BlockType> {
        match self {
            NodeKind::Block(block_type) => Some(block_type),
            _ => None,
        }
    }
}

/// A node of the document tree.
///
/// Containers own `children`; blocks own `text`. The other field is always
/// empty for the respective kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) text: String,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn block_type(&self) -> Option<&BlockType> {
        self.kind.block_type()
    }

    /// Whether this node is a paragraph block
    pub fn is_paragraph(&self) -> bool {
        self.block_type().is_some_and(BlockType::is_paragraph)
    }
}
