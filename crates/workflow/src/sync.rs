//! Synchronization barriers over node sets.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Barrier policy gating progression past a batch of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// The batch completes when every member finishes.
    AllComplete,
    /// The batch completes as soon as the first member finishes; the rest
    /// are detached (their results are recorded but no longer gate
    /// downstream nodes).
    AnyComplete,
    /// The batch completes once this many members have finished.
    Threshold(usize),
}

impl SyncPolicy {
    /// Completions needed for a batch of `batch_size` members.
    ///
    /// A threshold larger than the batch degenerates to all-complete.
    pub fn required(&self, batch_size: usize) -> usize {
        match self {
            SyncPolicy::AllComplete => batch_size,
            SyncPolicy::AnyComplete => 1.min(batch_size),
            SyncPolicy::Threshold(n) => (*n).min(batch_size),
        }
    }
}

/// A barrier policy attached to a set of workflow nodes.
///
/// Applies to a ready batch when every member of the point is in the batch.
/// The optional timeout bounds the wait: when it elapses, the batch proceeds
/// with whatever results exist (not an error).
#[derive(Debug, Clone)]
pub struct SynchronizationPoint {
    /// Nodes the barrier spans.
    pub members: BTreeSet<NodeId>,
    /// Completion policy.
    pub policy: SyncPolicy,
    /// Optional wait bound.
    pub timeout: Option<Duration>,
}

impl SynchronizationPoint {
    /// Create a barrier over `members`.
    pub fn new(members: impl IntoIterator<Item = NodeId>, policy: SyncPolicy) -> Self {
        Self {
            members: members.into_iter().collect(),
            policy,
            timeout: None,
        }
    }

    /// Bound the wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether this barrier governs the given batch.
    pub fn covers(&self, batch: &BTreeSet<NodeId>) -> bool {
        !self.members.is_empty() && self.members.is_subset(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_completions() {
        assert_eq!(SyncPolicy::AllComplete.required(3), 3);
        assert_eq!(SyncPolicy::AnyComplete.required(3), 1);
        assert_eq!(SyncPolicy::Threshold(2).required(3), 2);
        // Threshold past the batch size degenerates to all-complete.
        assert_eq!(SyncPolicy::Threshold(9).required(3), 3);
        assert_eq!(SyncPolicy::AnyComplete.required(0), 0);
    }

    #[test]
    fn test_covers_is_subset() {
        let point = SynchronizationPoint::new(
            [NodeId::new("a"), NodeId::new("b")],
            SyncPolicy::AllComplete,
        );
        let batch: BTreeSet<NodeId> = [NodeId::new("a"), NodeId::new("b"), NodeId::new("c")]
            .into_iter()
            .collect();
        assert!(point.covers(&batch));

        let partial: BTreeSet<NodeId> = [NodeId::new("a")].into_iter().collect();
        assert!(!point.covers(&partial));
    }
}
