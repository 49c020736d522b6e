use super::document::Document;
use super::node::NodeId;

/// A range of blocks between an anchor and a focus block (inclusive).
///
/// The focus may come before the anchor in document order; such a range is
/// backward but covers the same blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub anchor: NodeId,
    pub focus: NodeId,
}

impl BlockRange {
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// A selection made of zero or more block ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<BlockRange>,
}

impl Selection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Caret inside a single block
    pub fn collapsed(block: NodeId) -> Self {
        Self::range(block, block)
    }

    pub fn range(anchor: NodeId, focus: NodeId) -> Self {
        Self {
            ranges: vec![BlockRange { anchor, focus }],
        }
    }

    pub fn add_range(mut self, anchor: NodeId, focus: NodeId) -> Self {
        self.ranges.push(BlockRange { anchor, focus });
        self
    }

    pub fn ranges(&self) -> &[BlockRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The most recently added range, where the caret lives.
    pub fn last_range(&self) -> Option<&BlockRange> {
        self.ranges.last()
    }

    /// Every referenced node id, anchors and focuses.
    pub(crate) fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ranges
            .iter()
            .flat_map(|range| [range.anchor, range.focus])
    }

    /// Blocks touched by the selection in document order, without duplicates.
    ///
    /// Ranges with an end that is not a block of `doc` are skipped.
    pub fn selected_blocks(&self, doc: &Document) -> Vec<NodeId> {
        if self.ranges.is_empty() {
            return Vec::new();
        }

        let blocks = doc.blocks();
        let index_of = |id: NodeId| blocks.iter().position(|&block| block == id);

        let mut covered = vec![false; blocks.len()];
        for range in &self.ranges {
            let (Some(a), Some(b)) = (index_of(range.anchor), index_of(range.focus)) else {
                continue;
            };
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            covered[start..=end].iter_mut().for_each(|c| *c = true);
        }

        blocks
            .into_iter()
            .zip(covered)
            .filter_map(|(block, covered)| covered.then_some(block))
            .collect()
    }

    /// The first selected block in document order.
    pub fn first_block(&self, doc: &Document) -> Option<NodeId> {
        self.selected_blocks(doc).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockType, Schema};
    use pretty_assertions::assert_eq;

    fn doc_with_blocks(count: usize) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new(Schema::default());
        let root = doc.root();
        let ids = (0..count)
            .map(|i| {
                doc.append_block(root, BlockType::Paragraph, format!("block {i}"))
                    .unwrap()
            })
            .collect();
        (doc, ids)
    }

    #[test]
    fn test_empty_selection_selects_nothing() {
        let (doc, _) = doc_with_blocks(3);
        assert!(Selection::empty().selected_blocks(&doc).is_empty());
        assert_eq!(Selection::empty().first_block(&doc), None);
    }

    #[test]
    fn test_backward_range_is_in_document_order() {
        let (doc, ids) = doc_with_blocks(4);
        let selection = Selection::range(ids[2], ids[0]);

        assert_eq!(selection.selected_blocks(&doc), ids[0..=2].to_vec());
        assert_eq!(selection.first_block(&doc), Some(ids[0]));
    }

    #[test]
    fn test_overlapping_ranges_are_deduplicated() {
        let (doc, ids) = doc_with_blocks(5);
        let selection = Selection::range(ids[3], ids[4]).add_range(ids[0], ids[3]);

        assert_eq!(selection.selected_blocks(&doc), ids);
    }

    #[test]
    fn test_range_with_unknown_node_is_ignored() {
        let (doc, ids) = doc_with_blocks(2);
        let selection = Selection::range(ids[0], NodeId(999)).add_range(ids[1], ids[1]);

        assert_eq!(selection.selected_blocks(&doc), vec![ids[1]]);
    }

    #[test]
    fn test_range_spans_into_block_quote() {
        let mut doc = Document::new(Schema::default());
        let root = doc.root();
        let before = doc.append_block(root, BlockType::Paragraph, "a").unwrap();
        let quote = doc.append_container(root).unwrap();
        let inside = doc.append_block(quote, BlockType::Paragraph, "b").unwrap();
        let after = doc.append_block(root, BlockType::Paragraph, "c").unwrap();

        let selection = Selection::range(before, after);
        assert_eq!(selection.selected_blocks(&doc), vec![before, inside, after]);
    }
}
