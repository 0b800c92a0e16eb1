//! Error types for workflow graph construction.

use crate::NodeId;
use shopfloor_flow::FlowError;
use thiserror::Error;

/// Structural errors raised while building a workflow graph.
///
/// All of these abort construction; none of them can surface at run time.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The dependency edges contain a cycle.
    #[error("cyclic dependency involving nodes {nodes:?}")]
    CyclicDependency { nodes: Vec<NodeId> },

    /// A node id was added twice.
    #[error("node {id} already exists")]
    DuplicateNode { id: NodeId },

    /// An edge or branch referenced an id that was never added.
    #[error("unknown node {id}")]
    UnknownNode { id: NodeId },

    /// A branch target is not wired as a successor of its source.
    #[error("branch target {target} is not a successor of {from_node}")]
    BranchTargetNotSuccessor { from_node: NodeId, target: NodeId },

    /// Two branches were declared on the same source node.
    #[error("branch already declared for {from_node}")]
    DuplicateBranch { from_node: NodeId },

    /// A synchronization point referenced an empty member set.
    #[error("synchronization point has no members")]
    EmptySyncPoint,

    /// An embedded group has an invalid rank mapping.
    #[error(transparent)]
    Flow(#[from] FlowError),
}
