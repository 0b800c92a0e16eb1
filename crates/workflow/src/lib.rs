//! Dependency-graph workflows.
//!
//! A [`WorkflowGraph`] is a DAG of [`shopfloor_flow::FlowNode`]s with
//! "must-complete-before" edges, optional synchronization barriers over node
//! sets, and optional conditional branches that route on upstream results.
//!
//! Graphs are built once via [`WorkflowGraphBuilder`] and validated at
//! [`WorkflowGraphBuilder::build`]: unknown nodes, invalid branch targets,
//! invalid group rank mappings, and — most importantly — cycles are all
//! construction-time errors. A cyclic dependency never makes it to the
//! engine, where it could only show up as a silent stall.

mod branch;
mod error;
mod graph;
mod sync;

pub use branch::{BranchSelector, ConditionalBranch};
pub use error::GraphError;
pub use graph::{NodeId, WorkflowGraph, WorkflowGraphBuilder, WorkflowParts};
pub use sync::{SyncPolicy, SynchronizationPoint};
