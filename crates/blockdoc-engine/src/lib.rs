pub mod editing;
pub mod io;
pub mod models;

// Re-export key types for easier usage
pub use editing::{
    Command, CommandState, Editor, EditorError, ExecuteOptions, Executed, PARAGRAPH,
    ParagraphCommand,
};
pub use io::{IoError, parse_markdown, read_document, to_markdown, write_document};
pub use models::{BlockType, Document, ModelError, NodeId, Schema, Selection};
