//! Group composition with optional rank ordering.

use crate::{FlowError, FlowNode};
use std::collections::BTreeMap;

/// A set of member nodes executed together.
///
/// Without ranks, members start at the same virtual timestamp and the
/// engine interleaves them deterministically by priority then submission
/// order. With ranks, members run strictly sequentially in ascending rank.
///
/// The rank mapping must be empty or a bijection onto `1..=N`: duplicates
/// are rejected as soon as they are added, partial or out-of-range
/// assignments by [`ProcessGroup::validate`], which every executor calls
/// before starting the group.
#[derive(Debug, Default)]
pub struct ProcessGroup {
    members: Vec<FlowNode>,
    /// Member index -> rank.
    ranks: BTreeMap<usize, u32>,
}

impl ProcessGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unranked member.
    pub fn with(mut self, node: impl Into<FlowNode>) -> Self {
        self.members.push(node.into());
        self
    }

    /// Add a ranked member.
    ///
    /// Fails immediately when `rank` is already taken.
    pub fn with_ranked(mut self, node: impl Into<FlowNode>, rank: u32) -> Result<Self, FlowError> {
        if self.ranks.values().any(|&r| r == rank) {
            return Err(FlowError::DuplicateRank { rank });
        }
        self.members.push(node.into());
        self.ranks.insert(self.members.len() - 1, rank);
        Ok(self)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members in insertion order.
    pub fn members(&self) -> &[FlowNode] {
        &self.members
    }

    /// Consume the group into its members and the validated execution
    /// order (`None` for unranked groups).
    pub fn into_parts(self) -> (Vec<FlowNode>, Option<Vec<usize>>) {
        let order = if self.ranks.is_empty() {
            None
        } else {
            Some(self.rank_order())
        };
        (self.members, order)
    }

    /// Whether every member carries a rank.
    pub fn is_ranked(&self) -> bool {
        !self.ranks.is_empty() && self.ranks.len() == self.members.len()
    }

    /// Check the rank invariant: empty, or a bijection onto `1..=N`.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.ranks.is_empty() {
            return Ok(());
        }
        if self.ranks.len() != self.members.len() {
            return Err(FlowError::PartialRankAssignment {
                assigned: self.ranks.len(),
                total: self.members.len(),
            });
        }
        let mut got: Vec<u32> = self.ranks.values().copied().collect();
        got.sort_unstable();
        let expected: Vec<u32> = (1..=self.members.len() as u32).collect();
        if got != expected {
            return Err(FlowError::RankOutOfRange {
                total: self.members.len(),
                got,
            });
        }
        Ok(())
    }

    /// Member indices in ascending rank order.
    ///
    /// Call [`ProcessGroup::validate`] first; on an unranked group this is
    /// insertion order.
    pub fn rank_order(&self) -> Vec<usize> {
        if self.ranks.is_empty() {
            return (0..self.members.len()).collect();
        }
        let mut by_rank: Vec<(u32, usize)> = self
            .ranks
            .iter()
            .map(|(&idx, &rank)| (rank, idx))
            .collect();
        by_rank.sort_unstable();
        by_rank.into_iter().map(|(_, idx)| idx).collect()
    }

    /// Members in ascending rank order.
    pub fn sorted_members(&self) -> Vec<&FlowNode> {
        self.rank_order()
            .into_iter()
            .map(|idx| &self.members[idx])
            .collect()
    }

    /// Human-readable summary ("[a & b & c]"), for logs.
    pub fn summary(&self) -> String {
        if self.members.is_empty() {
            return "empty group".to_string();
        }
        let names: Vec<String> = self.members.iter().map(FlowNode::summary).collect();
        format!("[{}]", names.join(" & "))
    }
}
