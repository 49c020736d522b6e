pub mod document;
pub mod error;
pub mod history;
pub mod node;
pub mod position;
pub mod schema;
pub mod selection;

pub use document::{Document, SubscriptionId};
pub use error::ModelError;
pub use history::{Batch, BatchId, ChangeSet, History, Operation};
pub use node::{BlockType, HeadingLevel, Node, NodeId, NodeKind};
pub use position::Position;
pub use schema::Schema;
pub use selection::{BlockRange, Selection};
