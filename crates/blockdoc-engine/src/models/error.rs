use super::history::BatchId;
use super::node::NodeId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Node {0} is not a block")]
    NotABlock(NodeId),
    #[error("Node {0} cannot hold children")]
    NotAContainer(NodeId),
    #[error("Unknown or already undone batch: {0}")]
    UnknownBatch(BatchId),
}
