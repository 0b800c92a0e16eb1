//! Workflow graph construction and queries.

use crate::{ConditionalBranch, GraphError, SyncPolicy, SynchronizationPoint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shopfloor_flow::FlowNode;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::time::Duration;

/// Workflow node identifier, unique within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a node identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Builder for [`WorkflowGraph`].
///
/// Mutating methods fail fast on structural mistakes (duplicate ids,
/// unknown endpoints); [`WorkflowGraphBuilder::build`] runs the global
/// checks: branch target wiring, group rank mappings, and acyclicity.
#[derive(Default)]
pub struct WorkflowGraphBuilder {
    nodes: IndexMap<NodeId, FlowNode>,
    edges: Vec<(NodeId, NodeId)>,
    sync_points: Vec<SynchronizationPoint>,
    branches: Vec<ConditionalBranch>,
}

impl WorkflowGraphBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node (process, chain, or group) under a unique id.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        node: impl Into<FlowNode>,
    ) -> Result<(), GraphError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode { id });
        }
        self.nodes.insert(id, node.into());
        Ok(())
    }

    /// Add a "must-complete-before" edge.
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Result<(), GraphError> {
        let from = from.into();
        let to = to.into();
        for id in [&from, &to] {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::UnknownNode { id: id.clone() });
            }
        }
        self.edges.push((from, to));
        Ok(())
    }

    /// Attach a synchronization barrier to a node set.
    pub fn synchronize(
        &mut self,
        members: impl IntoIterator<Item = NodeId>,
        policy: SyncPolicy,
        timeout: Option<Duration>,
    ) -> Result<(), GraphError> {
        let mut point = SynchronizationPoint::new(members, policy);
        if point.members.is_empty() {
            return Err(GraphError::EmptySyncPoint);
        }
        for id in &point.members {
            if !self.nodes.contains_key(id) {
                return Err(GraphError::UnknownNode { id: id.clone() });
            }
        }
        point.timeout = timeout;
        self.sync_points.push(point);
        Ok(())
    }

    /// Attach a conditional branch to a source node.
    ///
    /// Targets must be wired as successors of the source via
    /// [`WorkflowGraphBuilder::add_edge`]; that wiring is checked at build
    /// time. One branch per source.
    pub fn branch_on(&mut self, branch: ConditionalBranch) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&branch.source) {
            return Err(GraphError::UnknownNode {
                id: branch.source.clone(),
            });
        }
        if self.branches.iter().any(|b| b.source == branch.source) {
            return Err(GraphError::DuplicateBranch {
                from_node: branch.source.clone(),
            });
        }
        for target in branch.all_targets() {
            if !self.nodes.contains_key(target) {
                return Err(GraphError::UnknownNode { id: target.clone() });
            }
        }
        self.branches.push(branch);
        Ok(())
    }

    /// Validate and freeze the graph.
    pub fn build(self) -> Result<WorkflowGraph, GraphError> {
        // Group rank mappings must be valid wherever a group is embedded.
        for node in self.nodes.values() {
            validate_flow_node(node)?;
        }

        let mut successors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut predecessors: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        for (from, to) in &self.edges {
            let succ = successors.entry(from.clone()).or_default();
            if !succ.contains(to) {
                succ.push(to.clone());
            }
            let pred = predecessors.entry(to.clone()).or_default();
            if !pred.contains(from) {
                pred.push(from.clone());
            }
        }

        // Branch targets must be declared successors of their source.
        for branch in &self.branches {
            let succ = successors.get(&branch.source);
            for target in branch.all_targets() {
                if !succ.is_some_and(|s| s.contains(target)) {
                    return Err(GraphError::BranchTargetNotSuccessor {
                        from_node: branch.source.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        // Kahn's algorithm: every node must be reachable through zero
        // in-degree peeling, otherwise the leftover nodes form a cycle.
        let mut in_degree: BTreeMap<&NodeId, usize> = self
            .nodes
            .keys()
            .map(|id| (id, predecessors.get(id).map_or(0, Vec::len)))
            .collect();
        let mut queue: VecDeque<&NodeId> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut visited = 0usize;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            if let Some(succ) = successors.get(id) {
                for next in succ {
                    let d = in_degree.get_mut(next).expect("edge endpoints validated");
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }
        if visited < self.nodes.len() {
            let nodes: Vec<NodeId> = in_degree
                .into_iter()
                .filter(|(_, d)| *d > 0)
                .map(|(id, _)| id.clone())
                .collect();
            return Err(GraphError::CyclicDependency { nodes });
        }

        Ok(WorkflowGraph {
            nodes: self.nodes,
            successors,
            predecessors,
            sync_points: self.sync_points,
            branches: self.branches,
        })
    }
}

fn validate_flow_node(node: &FlowNode) -> Result<(), GraphError> {
    match node {
        FlowNode::Process(_) => Ok(()),
        FlowNode::Chain(chain) => chain.nodes().iter().try_for_each(validate_flow_node),
        FlowNode::Group(group) => {
            group.validate()?;
            group.members().iter().try_for_each(validate_flow_node)
        }
    }
}

/// A validated, immutable workflow graph.
///
/// Built once per scenario, executed once, never mutated during execution.
pub struct WorkflowGraph {
    nodes: IndexMap<NodeId, FlowNode>,
    successors: BTreeMap<NodeId, Vec<NodeId>>,
    predecessors: BTreeMap<NodeId, Vec<NodeId>>,
    sync_points: Vec<SynchronizationPoint>,
    branches: Vec<ConditionalBranch>,
}

/// Owned pieces of a graph, handed to the executor.
pub struct WorkflowParts {
    /// Node id -> composition node, in insertion order.
    pub nodes: IndexMap<NodeId, FlowNode>,
    /// Forward edges.
    pub successors: BTreeMap<NodeId, Vec<NodeId>>,
    /// Reverse edges.
    pub predecessors: BTreeMap<NodeId, Vec<NodeId>>,
    /// Declared barriers.
    pub sync_points: Vec<SynchronizationPoint>,
    /// Declared branches.
    pub branches: Vec<ConditionalBranch>,
}

impl WorkflowGraph {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Look up a node.
    pub fn node(&self, id: &NodeId) -> Option<&FlowNode> {
        self.nodes.get(id)
    }

    /// Declared successors of a node.
    pub fn successors(&self, id: &NodeId) -> &[NodeId] {
        self.successors.get(id).map_or(&[], Vec::as_slice)
    }

    /// Declared predecessors of a node.
    pub fn predecessors(&self, id: &NodeId) -> &[NodeId] {
        self.predecessors.get(id).map_or(&[], Vec::as_slice)
    }

    /// Nodes with no predecessors.
    pub fn source_nodes(&self) -> Vec<&NodeId> {
        self.nodes
            .keys()
            .filter(|id| self.predecessors(id).is_empty())
            .collect()
    }

    /// Nodes with no successors.
    pub fn sink_nodes(&self) -> Vec<&NodeId> {
        self.nodes
            .keys()
            .filter(|id| self.successors(id).is_empty())
            .collect()
    }

    /// The barrier governing a ready batch, if any.
    ///
    /// The first declared point whose members are all in the batch wins;
    /// batches without a matching point default to all-complete.
    pub fn sync_point_for(&self, batch: &BTreeSet<NodeId>) -> Option<&SynchronizationPoint> {
        self.sync_points.iter().find(|p| p.covers(batch))
    }

    /// The branch declared on a node, if any.
    pub fn branch_for(&self, source: &NodeId) -> Option<&ConditionalBranch> {
        self.branches.iter().find(|b| &b.source == source)
    }

    /// Longest path through the graph weighted by nominal node durations.
    pub fn critical_path(&self) -> Vec<NodeId> {
        // Topological DP over an acyclic graph (guaranteed by build()).
        let order = self.topological_order();
        let mut best: BTreeMap<NodeId, (Duration, Option<NodeId>)> = BTreeMap::new();
        for id in &order {
            let own = self.nodes[id].nominal_duration();
            let (incoming, via) = self
                .predecessors(id)
                .iter()
                .filter_map(|p| best.get(p).map(|(d, _)| (*d, Some(p.clone()))))
                .max_by(|a, b| a.0.cmp(&b.0))
                .unwrap_or((Duration::ZERO, None));
            best.insert(id.clone(), (incoming + own, via));
        }

        let mut end = best
            .iter()
            .max_by(|a, b| a.1 .0.cmp(&b.1 .0))
            .map(|(id, _)| id.clone());
        let mut path = Vec::new();
        while let Some(id) = end {
            end = best[&id].1.clone();
            path.push(id);
        }
        path.reverse();
        path
    }

    /// Total nominal duration of the critical path.
    pub fn critical_path_duration(&self) -> Duration {
        self.critical_path()
            .iter()
            .map(|id| self.nodes[id].nominal_duration())
            .sum()
    }

    fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: BTreeMap<&NodeId, usize> = self
            .nodes
            .keys()
            .map(|id| (id, self.predecessors(id).len()))
            .collect();
        let mut queue: VecDeque<&NodeId> = self
            .nodes
            .keys()
            .filter(|id| self.predecessors(id).is_empty())
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.clone());
            for next in self.successors(id) {
                let d = in_degree.get_mut(next).expect("validated at build");
                *d -= 1;
                if *d == 0 {
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// Break the graph into owned pieces for execution.
    pub fn into_parts(self) -> WorkflowParts {
        WorkflowParts {
            nodes: self.nodes,
            successors: self.successors,
            predecessors: self.predecessors,
            sync_points: self.sync_points,
            branches: self.branches,
        }
    }
}

impl fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.successors.values().map(Vec::len).sum::<usize>())
            .field("sync_points", &self.sync_points.len())
            .field("branches", &self.branches.len())
            .finish()
    }
}
