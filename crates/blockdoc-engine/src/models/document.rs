use std::collections::VecDeque;
use std::fmt;

use super::error::ModelError;
use super::history::{BatchId, ChangeSet, History, Operation};
use super::node::{BlockType, Node, NodeId, NodeKind};
use super::schema::Schema;
use super::selection::Selection;

/// A queued unit of work run inside a change block.
type Change = Box<dyn FnOnce(&mut Document) -> Result<(), ModelError>>;

/// Callback invoked once per completed change block, undo or redo.
type Observer = Box<dyn FnMut(&ChangeSet)>;

/// Handle returned by [`Document::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Block document: a tree of containers and leaf blocks.
///
/// The document owns everything the editing commands operate on:
///
/// - **Tree**: nodes addressed by stable [`NodeId`]s. Nodes are never removed,
///   so ids held elsewhere stay valid.
/// - **Schema**: the rules deciding which node may live where.
/// - **Selection**: the live, user-facing selection.
/// - **History**: batches of reversible operations, undone and redone as one
///   step each.
///
/// ## Change blocks
///
/// Mutations go through [`Document::enqueue_changes`]. A change block runs the
/// given function, then every function enqueued while it ran, and only then
/// notifies observers, once, with all operations it applied. Observers never
/// see a half-applied block. If any function fails, everything the block
/// applied is reverted, the redo stack is put back and the error is returned.
/// Batches opened during a block that end up empty are dropped when it ends.
///
/// ```rust
/// # use blockdoc_engine::models::{BlockType, Document, HeadingLevel, Schema};
/// let mut doc = Document::new(Schema::default());
/// let root = doc.root();
/// let title = doc
///     .append_block(root, BlockType::Heading(HeadingLevel::new(1).unwrap()), "Title")
///     .unwrap();
///
/// doc.enqueue_changes(move |doc| {
///     let batch = doc.batch();
///     doc.rename(batch, title, BlockType::Paragraph)
/// })
/// .unwrap();
///
/// assert!(doc.node(title).unwrap().is_paragraph());
/// ```
pub struct Document {
    nodes: Vec<Node>,
    schema: Schema,
    selection: Selection,
    history: History,
    version: u64,
    pending: VecDeque<Change>,
    in_change_block: bool,
    /// Operations applied by the running change block, oldest first
    applied: Vec<(BatchId, Operation)>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl Document {
    /// Create an empty document holding only the root container.
    pub fn new(schema: Schema) -> Self {
        let root = Node {
            id: NodeId(0),
            kind: NodeKind::Root,
            parent: None,
            children: Vec::new(),
            text: String::new(),
        };

        Self {
            nodes: vec![root],
            schema,
            selection: Selection::empty(),
            history: History::default(),
            version: 0,
            pending: VecDeque::new(),
            in_change_block: false,
            applied: Vec::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.nodes.get(index))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        usize::try_from(id.0)
            .ok()
            .and_then(|index| self.nodes.get_mut(index))
    }

    pub fn block_type(&self, id: NodeId) -> Option<&BlockType> {
        self.node(id).and_then(Node::block_type)
    }

    /// All leaf blocks in document order (pre-order from the root).
    pub fn blocks(&self) -> Vec<NodeId> {
        let mut blocks = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if node.block_type().is_some() {
                blocks.push(id);
            }
            stack.extend(node.children().iter().rev());
        }
        blocks
    }

    /// Append a leaf block to `parent`. Construction is not recorded in history.
    pub fn append_block(
        &mut self,
        parent: NodeId,
        block_type: BlockType,
        text: impl Into<String>,
    ) -> Result<NodeId, ModelError> {
        self.append_node(parent, NodeKind::Block(block_type), text.into())
    }

    /// Append a block quote container to `parent`.
    pub fn append_container(&mut self, parent: NodeId) -> Result<NodeId, ModelError> {
        self.append_node(parent, NodeKind::BlockQuote, String::new())
    }

    fn append_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        text: String,
    ) -> Result<NodeId, ModelError> {
        let id = NodeId(self.nodes.len() as u64);
        let parent_node = self
            .node_mut(parent)
            .ok_or(ModelError::NodeNotFound(parent))?;
        if !parent_node.kind.is_container() {
            return Err(ModelError::NotAContainer(parent));
        }
        parent_node.children.push(id);

        self.nodes.push(Node {
            id,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            text,
        });
        Ok(id)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn set_schema(&mut self, schema: Schema) {
        self.schema = schema;
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the live selection. Every range end must be a block.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), ModelError> {
        for id in selection.nodes() {
            let node = self.node(id).ok_or(ModelError::NodeNotFound(id))?;
            if node.block_type().is_none() {
                return Err(ModelError::NotABlock(id));
            }
        }
        self.selection = selection;
        Ok(())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Incremented once per completed change block, undo and redo.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Open a new, empty batch. Operations recorded into it undo as one step.
    pub fn batch(&mut self) -> BatchId {
        self.history.open_batch()
    }

    /// Run `change` as part of a change block.
    ///
    /// Outside a change block this runs `change` and everything it enqueues
    /// before returning. Inside one, `change` is queued behind the running
    /// block and `Ok(())` is returned immediately.
    pub fn enqueue_changes<F>(&mut self, change: F) -> Result<(), ModelError>
    where
        F: FnOnce(&mut Document) -> Result<(), ModelError> + 'static,
    {
        self.pending.push_back(Box::new(change));
        if self.in_change_block {
            return Ok(());
        }

        self.in_change_block = true;
        let checkpoint = self.history.checkpoint();
        let mut result = Ok(());
        while let Some(change) = self.pending.pop_front() {
            if let Err(e) = change(self) {
                result = Err(e);
                break;
            }
        }
        self.in_change_block = false;
        let applied = std::mem::take(&mut self.applied);

        if let Err(e) = result {
            self.pending.clear();
            log::debug!(
                "Change block failed ({e}); reverting {} operation(s)",
                applied.len()
            );
            for (batch, operation) in applied.iter().rev() {
                self.apply_operation(&operation.reversed())?;
                self.history.forget(*batch, operation);
            }
            self.history.restore(checkpoint);
            return Err(e);
        }

        self.history.discard_empty_since(&checkpoint);
        log::debug!("Change block done with {} operation(s)", applied.len());
        self.notify(applied.into_iter().map(|(_, op)| op).collect());
        Ok(())
    }

    /// Change the type of a block, recording the operation into `batch`.
    ///
    /// Renaming to the current type is a no-op. Called outside a change
    /// block, the rename runs as a change block of its own.
    pub fn rename(
        &mut self,
        batch: BatchId,
        node: NodeId,
        to: BlockType,
    ) -> Result<(), ModelError> {
        if !self.in_change_block {
            return self.enqueue_changes(move |doc| doc.rename(batch, node, to));
        }

        let from = self
            .node(node)
            .ok_or(ModelError::NodeNotFound(node))?
            .block_type()
            .cloned()
            .ok_or(ModelError::NotABlock(node))?;
        if from == to {
            return Ok(());
        }
        if !self.history.contains(batch) {
            return Err(ModelError::UnknownBatch(batch));
        }

        log::debug!(
            "Renaming {node} from {} to {} in {batch}",
            from.schema_name(),
            to.schema_name()
        );
        let operation = Operation::Rename { node, from, to };
        self.apply_operation(&operation)?;
        self.history.record(batch, operation.clone());
        self.applied.push((batch, operation));
        Ok(())
    }

    /// Revert the newest non-empty batch. Returns `false` if there is none.
    pub fn undo(&mut self) -> Result<bool, ModelError> {
        if self.in_change_block {
            log::warn!("Undo requested inside a change block; ignored");
            return Ok(false);
        }
        let Some(batch) = self.history.take_undo() else {
            return Ok(false);
        };
        let reverted: Vec<Operation> = batch
            .operations()
            .iter()
            .rev()
            .map(Operation::reversed)
            .collect();

        log::debug!("Undoing {} operation(s)", reverted.len());
        for operation in &reverted {
            self.apply_operation(operation)?;
        }
        self.notify(reverted);
        Ok(true)
    }

    /// Re-apply the most recently undone batch. Returns `false` if there is none.
    pub fn redo(&mut self) -> Result<bool, ModelError> {
        if self.in_change_block {
            log::warn!("Redo requested inside a change block; ignored");
            return Ok(false);
        }
        let Some(batch) = self.history.take_redo() else {
            return Ok(false);
        };
        let operations = batch.operations().to_vec();

        log::debug!("Redoing {} operation(s)", operations.len());
        for operation in &operations {
            self.apply_operation(operation)?;
        }
        self.notify(operations);
        Ok(true)
    }

    fn apply_operation(&mut self, operation: &Operation) -> Result<(), ModelError> {
        match operation {
            Operation::Rename { node, to, .. } => {
                let target = self.node_mut(*node).ok_or(ModelError::NodeNotFound(*node))?;
                target.kind = NodeKind::Block(to.clone());
            }
        }
        Ok(())
    }

    /// Register an observer called after every completed change block, undo and redo.
    pub fn subscribe(&mut self, observer: impl FnMut(&ChangeSet) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(subscription, _)| *subscription != id);
        self.observers.len() != before
    }

    fn notify(&mut self, operations: Vec<Operation>) {
        self.version += 1;
        let changes = ChangeSet {
            operations,
            version: self.version,
        };
        for (_, observer) in &mut self.observers {
            observer(&changes);
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes)
            .field("selection", &self.selection)
            .field("version", &self.version)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HeadingLevel;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn heading(level: u8) -> BlockType {
        BlockType::Heading(HeadingLevel::new(level).unwrap())
    }

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new(Schema::default());
        let root = doc.root();
        let title = doc.append_block(root, heading(1), "Title").unwrap();
        let body = doc.append_block(root, BlockType::Paragraph, "Body").unwrap();
        (doc, title, body)
    }

    fn recorded(doc: &mut Document) -> Rc<RefCell<Vec<ChangeSet>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        doc.subscribe(move |changes| sink.borrow_mut().push(changes.clone()));
        seen
    }

    #[test]
    fn test_append_to_block_fails() {
        let (mut doc, title, _) = sample();
        assert_eq!(
            doc.append_block(title, BlockType::Paragraph, "x"),
            Err(ModelError::NotAContainer(title))
        );
        assert_eq!(
            doc.append_container(NodeId(77)),
            Err(ModelError::NodeNotFound(NodeId(77)))
        );
    }

    #[test]
    fn test_blocks_in_document_order() {
        let mut doc = Document::new(Schema::default());
        let root = doc.root();
        let a = doc.append_block(root, BlockType::Paragraph, "a").unwrap();
        let quote = doc.append_container(root).unwrap();
        let b = doc.append_block(root, BlockType::Paragraph, "c").unwrap();
        // Appended after `b` but lives inside the quote, which precedes `b`
        let inner = doc.append_block(quote, BlockType::ListItem, "b").unwrap();

        assert_eq!(doc.blocks(), vec![a, inner, b]);
    }

    #[test]
    fn test_set_selection_rejects_containers() {
        let (mut doc, title, _) = sample();
        let root = doc.root();
        assert_eq!(
            doc.set_selection(Selection::range(title, root)),
            Err(ModelError::NotABlock(root))
        );
        assert!(doc.set_selection(Selection::collapsed(title)).is_ok());
        assert_eq!(doc.selection(), &Selection::collapsed(title));
    }

    #[test]
    fn test_rename_outside_change_block_notifies_once() {
        let (mut doc, title, _) = sample();
        let seen = recorded(&mut doc);
        let batch = doc.batch();

        doc.rename(batch, title, BlockType::Paragraph).unwrap();

        assert!(doc.node(title).unwrap().is_paragraph());
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn test_rename_to_same_type_records_nothing() {
        let (mut doc, _, body) = sample();
        let batch = doc.batch();
        doc.rename(batch, body, BlockType::Paragraph).unwrap();

        assert!(doc.history().batch(batch).unwrap().is_empty());
    }

    #[test]
    fn test_rename_container_fails() {
        let (mut doc, _, _) = sample();
        let root = doc.root();
        let batch = doc.batch();
        assert_eq!(
            doc.rename(batch, root, BlockType::Paragraph),
            Err(ModelError::NotABlock(root))
        );
    }

    #[test]
    fn test_nested_enqueue_runs_after_current_block() {
        let (mut doc, title, body) = sample();
        let seen = recorded(&mut doc);
        let order = Rc::new(RefCell::new(Vec::new()));
        let outer_order = Rc::clone(&order);

        doc.enqueue_changes(move |doc| {
            let inner_order = Rc::clone(&outer_order);
            doc.enqueue_changes(move |doc| {
                inner_order.borrow_mut().push("inner");
                let batch = doc.batch();
                doc.rename(batch, body, heading(2))
            })?;
            outer_order.borrow_mut().push("outer");
            let batch = doc.batch();
            doc.rename(batch, title, BlockType::Paragraph)
        })
        .unwrap();

        assert_eq!(*order.borrow(), vec!["outer", "inner"]);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].operations.len(), 2);
    }

    #[test]
    fn test_failed_change_block_is_reverted() {
        let (mut doc, title, _) = sample();
        let seen = recorded(&mut doc);

        let result = doc.enqueue_changes(move |doc| {
            let batch = doc.batch();
            doc.rename(batch, title, BlockType::Paragraph)?;
            doc.rename(batch, NodeId(99), BlockType::Paragraph)
        });

        assert_eq!(result, Err(ModelError::NodeNotFound(NodeId(99))));
        assert_eq!(doc.block_type(title), Some(&heading(1)));
        assert!(seen.borrow().is_empty());
        assert!(!doc.history().can_undo());
    }

    #[test]
    fn test_failed_change_block_keeps_redo() {
        let (mut doc, title, body) = sample();
        let batch = doc.batch();
        doc.rename(batch, title, BlockType::Paragraph).unwrap();
        assert!(doc.undo().unwrap());

        let result = doc.enqueue_changes(move |doc| {
            let batch = doc.batch();
            doc.rename(batch, body, heading(3))?;
            doc.rename(batch, NodeId(99), BlockType::Paragraph)
        });

        assert_eq!(result, Err(ModelError::NodeNotFound(NodeId(99))));
        assert_eq!(doc.block_type(body), Some(&BlockType::Paragraph));
        assert!(doc.history().can_redo());
        assert!(doc.redo().unwrap());
        assert!(doc.node(title).unwrap().is_paragraph());
    }

    #[test]
    fn test_empty_batches_are_dropped_when_block_ends() {
        let (mut doc, title, body) = sample();
        let kept = doc.batch();

        for _ in 0..10 {
            doc.enqueue_changes(move |doc| {
                let batch = doc.batch();
                doc.rename(batch, body, BlockType::Paragraph)
            })
            .unwrap();
        }
        let _ = doc.enqueue_changes(move |doc| {
            let batch = doc.batch();
            doc.rename(batch, title, BlockType::Paragraph)?;
            doc.rename(batch, NodeId(99), BlockType::Paragraph)
        });

        // Only the batch opened outside any change block survives
        let ids: Vec<BatchId> = doc.history().batches().iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec![kept]);
        assert_eq!(doc.version(), 10);
    }

    #[test]
    fn test_undo_and_redo_batch() {
        let (mut doc, title, body) = sample();
        let seen = recorded(&mut doc);

        doc.enqueue_changes(move |doc| {
            let batch = doc.batch();
            doc.rename(batch, title, BlockType::Paragraph)?;
            doc.rename(batch, body, BlockType::ListItem)
        })
        .unwrap();

        assert!(doc.undo().unwrap());
        assert_eq!(doc.block_type(title), Some(&heading(1)));
        assert_eq!(doc.block_type(body), Some(&BlockType::Paragraph));

        assert!(doc.redo().unwrap());
        assert_eq!(doc.block_type(title), Some(&BlockType::Paragraph));
        assert_eq!(doc.block_type(body), Some(&BlockType::ListItem));

        assert!(!doc.redo().unwrap());
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(doc.version(), 3);
    }

    #[test]
    fn test_undo_with_empty_history() {
        let (mut doc, _, _) = sample();
        assert!(!doc.undo().unwrap());
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let (mut doc, title, _) = sample();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let id = doc.subscribe(move |_| *sink.borrow_mut() += 1);

        assert!(doc.unsubscribe(id));
        assert!(!doc.unsubscribe(id));

        let batch = doc.batch();
        doc.rename(batch, title, BlockType::Paragraph).unwrap();
        assert_eq!(*seen.borrow(), 0);
    }
}
