use std::fmt;

use super::node::{BlockType, NodeId};

/// Handle to a batch of operations recorded in a document's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub(crate) u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

/// A single reversible mutation of the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Rename {
        node: NodeId,
        from: BlockType,
        to: BlockType,
    },
}

impl Operation {
    pub fn reversed(&self) -> Operation {
        match self {
            Operation::Rename { node, from, to } => Operation::Rename {
                node: *node,
                from: to.clone(),
                to: from.clone(),
            },
        }
    }

    pub fn node(&self) -> NodeId {
        match self {
            Operation::Rename { node, .. } => *node,
        }
    }
}

/// Operations collected under one undo step.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    id: BatchId,
    operations: Vec<Operation>,
}

impl Batch {
    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Everything that happened during one completed change block, undo or redo.
///
/// Observers receive this once the whole step is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub operations: Vec<Operation>,
    /// Document version after the step
    pub version: u64,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// History state captured when a change block starts.
#[derive(Debug)]
pub(crate) struct Checkpoint {
    first_new_id: u64,
    undone: Vec<Batch>,
}

/// Undo and redo stacks of batches.
///
/// `done` holds batches in creation order, newest last. Recording a new
/// operation into any batch invalidates the redo stack.
#[derive(Debug, Default)]
pub struct History {
    done: Vec<Batch>,
    undone: Vec<Batch>,
    next_id: u64,
}

impl History {
    pub(crate) fn open_batch(&mut self) -> BatchId {
        let id = BatchId(self.next_id);
        self.next_id += 1;
        self.done.push(Batch {
            id,
            operations: Vec::new(),
        });
        id
    }

    /// Remember the redo stack and the first batch id a change block may open.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            first_new_id: self.next_id,
            undone: self.undone.clone(),
        }
    }

    /// Drop batches opened since `checkpoint` that hold no operations.
    pub(crate) fn discard_empty_since(&mut self, checkpoint: &Checkpoint) {
        self.done
            .retain(|batch| batch.id.0 < checkpoint.first_new_id || !batch.is_empty());
    }

    /// Put history back the way it was at `checkpoint`, once the operations
    /// recorded since have been forgotten.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.discard_empty_since(&checkpoint);
        self.undone = checkpoint.undone;
    }

    pub(crate) fn contains(&self, id: BatchId) -> bool {
        self.done.iter().any(|batch| batch.id == id)
    }

    /// Append an operation to an open batch. Returns `false` for unknown batches.
    pub(crate) fn record(&mut self, id: BatchId, operation: Operation) -> bool {
        let Some(batch) = self.done.iter_mut().rev().find(|batch| batch.id == id) else {
            return false;
        };
        batch.operations.push(operation);
        self.undone.clear();
        true
    }

    /// Remove the newest matching operation from a batch (used to roll back a
    /// failed change block).
    pub(crate) fn forget(&mut self, id: BatchId, operation: &Operation) {
        if let Some(batch) = self.done.iter_mut().rev().find(|batch| batch.id == id)
            && let Some(index) = batch.operations.iter().rposition(|op| op == operation)
        {
            batch.operations.remove(index);
        }
    }

    /// Pop the newest non-empty batch onto the redo stack.
    ///
    /// Empty batches sitting above it are discarded, so the returned batch is
    /// always one undo step.
    pub(crate) fn take_undo(&mut self) -> Option<&Batch> {
        while let Some(batch) = self.done.pop() {
            if !batch.is_empty() {
                self.undone.push(batch);
                return self.undone.last();
            }
        }
        None
    }

    pub(crate) fn take_redo(&mut self) -> Option<&Batch> {
        let batch = self.undone.pop()?;
        self.done.push(batch);
        self.done.last()
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.done.iter().find(|batch| batch.id == id)
    }

    pub fn can_undo(&self) -> bool {
        self.done.iter().any(|batch| !batch.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Batches that can still be undone, oldest first
    pub fn batches(&self) -> &[Batch] {
        &self.done
    }
}
