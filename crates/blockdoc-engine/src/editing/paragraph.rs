use crate::editing::commands::{Command, CommandState, ExecuteOptions};
use crate::models::{BlockType, Document, ModelError, Position};

/// Turns the selected blocks into paragraphs.
///
/// `value` is true when the first selected block is already a paragraph;
/// `is_enabled` is true when the schema permits a paragraph right before
/// that block.
#[derive(Debug, Default)]
pub struct ParagraphCommand {
    state: CommandState,
}

impl ParagraphCommand {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Command for ParagraphCommand {
    fn refresh(&mut self, doc: &Document) {
        let block = doc.selection().first_block(doc);

        let value = block
            .and_then(|id| doc.node(id))
            .is_some_and(|node| node.is_paragraph());

        let is_enabled = block
            .and_then(|id| Position::before(doc, id))
            .is_some_and(|position| {
                doc.schema()
                    .check(BlockType::Paragraph.schema_name(), &position, doc)
            });

        self.state.update(value, is_enabled);
    }

    fn execute(&mut self, doc: &mut Document, options: ExecuteOptions) -> Result<(), ModelError> {
        doc.enqueue_changes(move |doc| {
            let batch = match options.batch {
                Some(batch) => batch,
                None => doc.batch(),
            };
            let blocks = match &options.selection {
                Some(selection) => selection.selected_blocks(doc),
                None => doc.selection().selected_blocks(doc),
            };

            for block in blocks {
                if !doc.node(block).is_some_and(|node| node.is_paragraph()) {
                    doc.rename(batch, block, BlockType::Paragraph)?;
                }
            }
            Ok(())
        })
    }

    fn state(&self) -> CommandState {
        self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }
}
