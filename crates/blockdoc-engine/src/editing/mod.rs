/*!
 * # Editing commands
 *
 * Commands are the only way front-ends change a [`Document`](crate::models::Document).
 *
 * Each command exposes a [`CommandState`] with two observable fields:
 *
 * - **`value`**: command-specific, e.g. "the selection already is a paragraph"
 * - **`is_enabled`**: whether executing is legal for the current selection
 *
 * A command's `refresh` recomputes both from the live selection and schema.
 * The [`Editor`] owns the document together with a registry of named commands
 * and refreshes all of them after every change, so a toolbar can read
 * `command_state` at any time without going stale.
 *
 * `execute` applies the command inside one change block, so everything a
 * command does is a single undo step and observers see it as one change.
 *
 * ## Usage Pattern
 *
 * ```rust
 * use blockdoc_engine::editing::*;
 * use blockdoc_engine::models::{BlockType, Document, HeadingLevel, Schema, Selection};
 *
 * let mut doc = Document::new(Schema::default());
 * let root = doc.root();
 * let title = doc
 *     .append_block(root, BlockType::Heading(HeadingLevel::new(1).unwrap()), "Title")
 *     .unwrap();
 *
 * let mut editor = Editor::new(doc);
 * editor.set_selection(Selection::collapsed(title)).unwrap();
 *
 * editor.execute(PARAGRAPH, ExecuteOptions::default()).unwrap();
 * assert_eq!(editor.command_state(PARAGRAPH).map(|s| s.value), Some(true));
 *
 * editor.undo().unwrap();
 * assert_eq!(editor.command_state(PARAGRAPH).map(|s| s.value), Some(false));
 * ```
 */

pub mod commands;
pub mod editor;
pub mod paragraph;

pub use commands::{Command, CommandState, ExecuteOptions};
pub use editor::{Editor, EditorError, Executed, PARAGRAPH};
pub use paragraph::ParagraphCommand;
