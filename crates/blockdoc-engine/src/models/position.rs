use super::document::Document;
use super::node::NodeId;

/// A point between two children of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub parent: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(parent: NodeId, offset: usize) -> Self {
        Self { parent, offset }
    }

    /// Position directly before `node` in its parent.
    ///
    /// `None` for the root and for ids not in the document.
    pub fn before(doc: &Document, node: NodeId) -> Option<Self> {
        let parent = doc.node(node)?.parent()?;
        let offset = doc
            .node(parent)?
            .children()
            .iter()
            .position(|&child| child == node)?;
        Some(Self { parent, offset })
    }

    /// Position directly after `node` in its parent.
    pub fn after(doc: &Document, node: NodeId) -> Option<Self> {
        Self::before(doc, node).map(|position| Self {
            offset: position.offset + 1,
            ..position
        })
    }
}
