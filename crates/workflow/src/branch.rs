//! Conditional routing on upstream results.

use crate::NodeId;
use shopfloor_types::ProcessResult;
use std::collections::BTreeMap;
use std::fmt;

/// Maps an upstream result to a branch key.
///
/// Returning `None`, or a key with no declared branch, activates nothing;
/// the deselected targets are reported as skipped in the run report rather
/// than silently dropped.
pub type BranchSelector = Box<dyn Fn(&ProcessResult) -> Option<String> + Send>;

/// A routing decision attached to one workflow node.
///
/// When the source node completes, the selector picks a branch key and only
/// that key's targets are activated. Every target must be a declared
/// successor of the source.
pub struct ConditionalBranch {
    /// Node whose result drives the decision.
    pub source: NodeId,
    selector: BranchSelector,
    /// Branch key -> activated successor nodes.
    pub branches: BTreeMap<String, Vec<NodeId>>,
}

impl ConditionalBranch {
    /// Create a branch on `source`.
    pub fn new(
        source: NodeId,
        selector: impl Fn(&ProcessResult) -> Option<String> + Send + 'static,
        branches: BTreeMap<String, Vec<NodeId>>,
    ) -> Self {
        Self {
            source,
            selector: Box::new(selector),
            branches,
        }
    }

    /// All targets named by any branch.
    pub fn all_targets(&self) -> impl Iterator<Item = &NodeId> {
        self.branches.values().flatten()
    }

    /// Evaluate the selector and return the activated targets.
    ///
    /// `None` means no branch matched and nothing is activated.
    pub fn select(&self, result: &ProcessResult) -> Option<&[NodeId]> {
        let key = (self.selector)(result)?;
        self.branches.get(&key).map(Vec::as_slice)
    }
}

impl fmt::Debug for ConditionalBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The selector is an opaque closure; show everything else.
        f.debug_struct("ConditionalBranch")
            .field("source", &self.source)
            .field("branches", &self.branches)
            .finish()
    }
}
