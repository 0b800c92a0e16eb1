//! The unit of composition.

use crate::{ProcessChain, ProcessGroup};
use shopfloor_core::ProcessSpec;
use std::fmt;

/// One node in a composition: a single process, a chain, or a group.
///
/// Chains and groups contain further nodes, so composition nests to any
/// depth.
pub enum FlowNode {
    /// A single process.
    Process(ProcessSpec),
    /// A linear sequence.
    Chain(ProcessChain),
    /// A set with optional rank ordering.
    Group(ProcessGroup),
}

impl FlowNode {
    /// Human-readable summary, for logs.
    pub fn summary(&self) -> String {
        match self {
            FlowNode::Process(spec) => spec.name.clone(),
            FlowNode::Chain(chain) => chain.summary(),
            FlowNode::Group(group) => group.summary(),
        }
    }

    /// Number of leaf processes under this node.
    pub fn process_count(&self) -> usize {
        match self {
            FlowNode::Process(_) => 1,
            FlowNode::Chain(chain) => chain.nodes().iter().map(FlowNode::process_count).sum(),
            FlowNode::Group(group) => group.members().iter().map(FlowNode::process_count).sum(),
        }
    }

    /// Nominal (base) duration of this node, ignoring contention and
    /// behaviors: chains and ranked groups sum their members, unranked
    /// groups take the slowest member.
    pub fn nominal_duration(&self) -> std::time::Duration {
        match self {
            FlowNode::Process(spec) => spec.duration,
            FlowNode::Chain(chain) => chain.nodes().iter().map(FlowNode::nominal_duration).sum(),
            FlowNode::Group(group) => {
                let durations = group.members().iter().map(FlowNode::nominal_duration);
                if group.is_ranked() {
                    durations.sum()
                } else {
                    durations.max().unwrap_or_default()
                }
            }
        }
    }
}

impl fmt::Debug for FlowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowNode::Process(spec) => f.debug_tuple("Process").field(&spec.id).finish(),
            FlowNode::Chain(chain) => f.debug_tuple("Chain").field(&chain.len()).finish(),
            FlowNode::Group(group) => f.debug_tuple("Group").field(&group.len()).finish(),
        }
    }
}

impl From<ProcessSpec> for FlowNode {
    fn from(spec: ProcessSpec) -> Self {
        FlowNode::Process(spec)
    }
}

impl From<ProcessChain> for FlowNode {
    fn from(chain: ProcessChain) -> Self {
        FlowNode::Chain(chain)
    }
}

impl From<ProcessGroup> for FlowNode {
    fn from(group: ProcessGroup) -> Self {
        FlowNode::Group(group)
    }
}
