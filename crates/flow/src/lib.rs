//! Process algebra for composing processes.
//!
//! Two operators:
//!
//! - [`ProcessChain::then`] builds a strictly linear sequence; the output of
//!   node *i* becomes the input of node *i+1*. Chaining a chain splices, so
//!   the operator is associative.
//! - [`ProcessGroup::with`] collects members into a group. A group is either
//!   unranked (members start at the same virtual timestamp and interleave
//!   deterministically) or fully ranked (members run sequentially in
//!   ascending rank). Partial or duplicate rank assignments are rejected
//!   when the group is composed, not when it runs.
//!
//! Chains and groups are themselves [`FlowNode`]s, so composition nests
//! arbitrarily: a group inside a chain inside another group is fine.

mod chain;
mod error;
mod group;
mod node;

pub use chain::ProcessChain;
pub use error::FlowError;
pub use group::ProcessGroup;
pub use node::FlowNode;
