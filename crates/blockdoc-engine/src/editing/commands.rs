use crate::models::{BatchId, Document, ModelError, Selection};

/// Observable state of a command, read by toolbars and status bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandState {
    /// Command-specific value, e.g. "the selection is already a paragraph"
    pub value: bool,
    /// Whether executing the command is currently legal
    pub is_enabled: bool,
}

impl CommandState {
    /// Overwrite the state, returning whether anything changed.
    pub fn update(&mut self, value: bool, is_enabled: bool) -> bool {
        let changed = self.value != value || self.is_enabled != is_enabled;
        self.value = value;
        self.is_enabled = is_enabled;
        changed
    }
}

/// Options accepted by [`Command::execute`].
///
/// Unset fields fall back to a fresh batch and the document's live selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteOptions {
    pub batch: Option<BatchId>,
    pub selection: Option<Selection>,
}

impl ExecuteOptions {
    pub fn with_batch(mut self, batch: BatchId) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// An editing command with observable state.
pub trait Command {
    /// Recompute [`CommandState`] from the document's current selection and schema.
    fn refresh(&mut self, doc: &Document);

    /// Apply the command. Callers are expected to check `state().is_enabled` first.
    fn execute(&mut self, doc: &mut Document, options: ExecuteOptions) -> Result<(), ModelError>;

    fn state(&self) -> CommandState;

    /// Mutable access to the state so the host can force it (read-only mode).
    fn state_mut(&mut self) -> &mut CommandState;
}
