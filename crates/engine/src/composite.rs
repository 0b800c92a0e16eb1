//! Composition bookkeeping: chains, groups, and workflow graphs.
//!
//! Each composite is a small state machine the runner drives with member
//! completions. It never touches pools or the clock; instead it returns
//! [`Directive`]s (spawn a child, schedule a barrier timeout, emit the
//! aggregate result) for the runner to execute, the same split the process
//! state machines use.

use crate::CompositeId;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use shopfloor_flow::{FlowNode, ProcessChain, ProcessGroup};
use shopfloor_types::{Payload, ProcessId, ProcessResult, SubmissionId};
use shopfloor_workflow::{
    ConditionalBranch, NodeId, SyncPolicy, SynchronizationPoint, WorkflowGraph,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

/// Where a spawned node reports its completion.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ParentLink {
    /// Top-level submission: completion becomes the submission outcome.
    Submission(SubmissionId),
    /// Member of a composite, by member index.
    Member {
        composite: CompositeId,
        member: usize,
    },
}

/// Instructions a composite hands back to the runner.
pub(crate) enum Directive {
    /// Start a child node now.
    Spawn {
        node: FlowNode,
        parent: ParentLink,
        input: Payload,
    },
    /// Arm a barrier timeout for the given batch epoch.
    ScheduleTimeout {
        composite: CompositeId,
        epoch: u64,
        delay: Duration,
    },
    /// The composite finished: record its aggregate result and retire it.
    Emit {
        from: CompositeId,
        parent: ParentLink,
        result: ProcessResult,
    },
    /// Workflow nodes deselected by conditional branches.
    RecordSkipped { nodes: Vec<NodeId> },
}

/// Any composition node the runner is tracking.
pub(crate) enum CompositeState {
    Chain(ChainState),
    Group(GroupState),
    Graph(GraphState),
}

impl CompositeState {
    pub(crate) fn on_member_complete(
        &mut self,
        member: usize,
        result: ProcessResult,
        now: Duration,
    ) -> Vec<Directive> {
        match self {
            CompositeState::Chain(c) => c.on_member_complete(member, result, now),
            CompositeState::Group(g) => g.on_member_complete(member, result, now),
            CompositeState::Graph(g) => g.on_member_complete(member, result, now),
        }
    }

    /// Barrier timeout delivery. Returns whether the timeout actually fired
    /// (stale epochs are ignored).
    pub(crate) fn on_timeout(&mut self, epoch: u64, now: Duration) -> (bool, Vec<Directive>) {
        match self {
            CompositeState::Graph(g) => g.on_timeout(epoch, now),
            _ => (false, Vec::new()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Chain
// ═══════════════════════════════════════════════════════════════════════

/// Linear sequence: each completion feeds the next node's input.
pub(crate) struct ChainState {
    id: CompositeId,
    parent: ParentLink,
    name: String,
    remaining: VecDeque<FlowNode>,
    completed: usize,
    started_at: Duration,
    last: Option<ProcessResult>,
}

impl ChainState {
    pub(crate) fn new(
        id: CompositeId,
        parent: ParentLink,
        chain: ProcessChain,
        now: Duration,
    ) -> Self {
        Self {
            id,
            parent,
            name: chain.summary(),
            remaining: chain.into_nodes().into(),
            completed: 0,
            started_at: now,
            last: None,
        }
    }

    pub(crate) fn start(&mut self, input: Payload, now: Duration) -> Vec<Directive> {
        match self.remaining.pop_front() {
            Some(node) => vec![Directive::Spawn {
                node,
                parent: ParentLink::Member {
                    composite: self.id,
                    member: self.completed,
                },
                input,
            }],
            // An empty chain passes its input straight through.
            None => vec![self.emit(input, true, now)],
        }
    }

    fn on_member_complete(
        &mut self,
        _member: usize,
        result: ProcessResult,
        now: Duration,
    ) -> Vec<Directive> {
        self.completed += 1;
        let payload = result.payload.clone();
        let success = result.success;
        self.last = Some(result);
        match self.remaining.pop_front() {
            // Output of node i is the input of node i+1; failed results
            // flow forward as data just like successes.
            Some(node) => vec![Directive::Spawn {
                node,
                parent: ParentLink::Member {
                    composite: self.id,
                    member: self.completed,
                },
                input: payload,
            }],
            None => vec![self.emit(payload, success, now)],
        }
    }

    fn emit(&self, payload: Payload, success: bool, now: Duration) -> Directive {
        let result = ProcessResult {
            process_id: ProcessId::new(format!("chain#{}", self.id)),
            name: self.name.clone(),
            success,
            payload,
            started_at: self.started_at,
            finished_at: now,
            error: self.last.as_ref().and_then(|r| r.error.clone()),
        };
        Directive::Emit {
            from: self.id,
            parent: self.parent,
            result,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Group
// ═══════════════════════════════════════════════════════════════════════

/// Group of members sharing one input.
///
/// Ranked groups run members strictly sequentially in ascending rank;
/// unranked groups start every member at the same virtual timestamp and let
/// the event queue interleave them by priority then submission order.
pub(crate) struct GroupState {
    id: CompositeId,
    parent: ParentLink,
    name: String,
    started_at: Duration,
    input: Payload,
    /// Remaining (member slot, node) pairs for sequential mode.
    pending: VecDeque<(usize, FlowNode)>,
    total: usize,
    completed: usize,
    results: Vec<Option<ProcessResult>>,
    sequential: bool,
}

impl GroupState {
    pub(crate) fn new(
        id: CompositeId,
        parent: ParentLink,
        group: ProcessGroup,
        input: Payload,
        now: Duration,
    ) -> Self {
        let name = group.summary();
        let (members, order) = group.into_parts();
        let total = members.len();
        let sequential = order.is_some();
        let mut slots: Vec<Option<FlowNode>> = members.into_iter().map(Some).collect();
        let spawn_order = order.unwrap_or_else(|| (0..total).collect());
        let pending: VecDeque<(usize, FlowNode)> = spawn_order
            .into_iter()
            .map(|idx| {
                let node = slots[idx].take().expect("each member spawns once");
                (idx, node)
            })
            .collect();
        Self {
            id,
            parent,
            name,
            started_at: now,
            input,
            pending,
            total,
            completed: 0,
            results: (0..total).map(|_| None).collect(),
            sequential,
        }
    }

    pub(crate) fn start(&mut self, now: Duration) -> Vec<Directive> {
        if self.total == 0 {
            return vec![self.emit(now)];
        }
        if self.sequential {
            self.spawn_next().into_iter().collect()
        } else {
            // All members start at the same timestamp; the event queue
            // interleaves them deterministically.
            let mut directives = Vec::with_capacity(self.total);
            while let Some(d) = self.spawn_next() {
                directives.push(d);
            }
            directives
        }
    }

    fn spawn_next(&mut self) -> Option<Directive> {
        let (member, node) = self.pending.pop_front()?;
        Some(Directive::Spawn {
            node,
            parent: ParentLink::Member {
                composite: self.id,
                member,
            },
            input: self.input.clone(),
        })
    }

    fn on_member_complete(
        &mut self,
        member: usize,
        result: ProcessResult,
        now: Duration,
    ) -> Vec<Directive> {
        self.results[member] = Some(result);
        self.completed += 1;
        if self.sequential {
            if let Some(d) = self.spawn_next() {
                return vec![d];
            }
        }
        if self.completed == self.total {
            return vec![self.emit(now)];
        }
        Vec::new()
    }

    fn emit(&self, now: Duration) -> Directive {
        let success = self
            .results
            .iter()
            .flatten()
            .all(|r| r.success);
        let payload = Value::Array(
            self.results
                .iter()
                .flatten()
                .map(|r| r.payload.clone())
                .collect(),
        );
        let error = self
            .results
            .iter()
            .flatten()
            .find_map(|r| r.error.clone());
        let result = ProcessResult {
            process_id: ProcessId::new(format!("group#{}", self.id)),
            name: self.name.clone(),
            success,
            payload,
            started_at: self.started_at,
            finished_at: now,
            error,
        };
        Directive::Emit {
            from: self.id,
            parent: self.parent,
            result,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Workflow graph
// ═══════════════════════════════════════════════════════════════════════

/// Kahn-batch execution state for one workflow graph.
///
/// Ready nodes (in-degree zero) form a batch started at one timestamp. The
/// batch's barrier policy decides when dependents unblock; conditional
/// branches gate their targets on the actual upstream result.
pub(crate) struct GraphState {
    id: CompositeId,
    parent: ParentLink,
    name: String,
    started_at: Duration,
    input: Payload,
    nodes: IndexMap<NodeId, Option<FlowNode>>,
    successors: BTreeMap<NodeId, Vec<NodeId>>,
    predecessors: BTreeMap<NodeId, Vec<NodeId>>,
    sync_points: Vec<SynchronizationPoint>,
    branches: Vec<ConditionalBranch>,
    /// Member index -> node id, assigned at spawn time.
    member_ids: Vec<NodeId>,
    in_degree: BTreeMap<NodeId, usize>,
    /// Released predecessor edges that were real (not branch-deselected).
    real_contribs: BTreeMap<NodeId, usize>,
    results: BTreeMap<NodeId, ProcessResult>,
    skipped: BTreeSet<NodeId>,
    activated: BTreeSet<NodeId>,
    finished: BTreeSet<NodeId>,
    /// Nodes whose dependencies are satisfied, waiting for the next batch.
    ready_pending: BTreeSet<NodeId>,
    batch: BTreeSet<NodeId>,
    batch_open: bool,
    batch_epoch: u64,
    batch_required: usize,
    batch_finished: usize,
    /// Detached branch sources whose successor edges are held until their
    /// result arrives.
    deferred_branch_sources: BTreeSet<NodeId>,
    /// Barrier fallback for batches without a declared point.
    default_policy: SyncPolicy,
    default_timeout: Option<Duration>,
    done: bool,
}

impl GraphState {
    pub(crate) fn new(
        id: CompositeId,
        parent: ParentLink,
        name: impl Into<String>,
        graph: WorkflowGraph,
        input: Payload,
        now: Duration,
        defaults: (SyncPolicy, Option<Duration>),
    ) -> Self {
        let parts = graph.into_parts();
        let in_degree: BTreeMap<NodeId, usize> = parts
            .nodes
            .keys()
            .map(|id| {
                (
                    id.clone(),
                    parts.predecessors.get(id).map_or(0, Vec::len),
                )
            })
            .collect();
        Self {
            id,
            parent,
            name: name.into(),
            started_at: now,
            input,
            nodes: parts
                .nodes
                .into_iter()
                .map(|(id, node)| (id, Some(node)))
                .collect(),
            successors: parts.successors,
            predecessors: parts.predecessors,
            sync_points: parts.sync_points,
            branches: parts.branches,
            member_ids: Vec::new(),
            real_contribs: BTreeMap::new(),
            results: BTreeMap::new(),
            skipped: BTreeSet::new(),
            activated: BTreeSet::new(),
            finished: BTreeSet::new(),
            ready_pending: BTreeSet::new(),
            batch: BTreeSet::new(),
            batch_open: false,
            batch_epoch: 0,
            batch_required: 0,
            batch_finished: 0,
            deferred_branch_sources: BTreeSet::new(),
            default_policy: defaults.0,
            default_timeout: defaults.1,
            in_degree,
            done: false,
        }
    }

    pub(crate) fn start(&mut self, now: Duration) -> Vec<Directive> {
        if self.nodes.is_empty() {
            return self.finish(now);
        }
        let ready: BTreeSet<NodeId> = self
            .in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(id, _)| id.clone())
            .collect();
        self.start_batch(ready)
    }

    fn start_batch(&mut self, ready: BTreeSet<NodeId>) -> Vec<Directive> {
        self.batch_epoch += 1;
        self.batch_open = true;
        self.batch_finished = 0;
        let (policy, timeout) = self
            .sync_points
            .iter()
            .find(|p| p.covers(&ready))
            .map(|p| (p.policy, p.timeout))
            .unwrap_or((self.default_policy, self.default_timeout));
        self.batch_required = policy.required(ready.len());
        self.batch = ready;

        let mut directives = Vec::new();
        // Spawn in node declaration order for reproducible sequence numbers.
        let batch_ids: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| self.batch.contains(*id))
            .cloned()
            .collect();
        for id in batch_ids {
            directives.push(self.spawn_member(&id));
        }
        if let Some(delay) = timeout {
            directives.push(Directive::ScheduleTimeout {
                composite: self.id,
                epoch: self.batch_epoch,
                delay,
            });
        }
        directives
    }

    fn spawn_member(&mut self, id: &NodeId) -> Directive {
        let node = self
            .nodes
            .get_mut(id)
            .and_then(Option::take)
            .expect("node spawns exactly once");
        let member = self.member_ids.len();
        self.member_ids.push(id.clone());
        self.activated.insert(id.clone());
        Directive::Spawn {
            node,
            parent: ParentLink::Member {
                composite: self.id,
                member,
            },
            input: self.input_for(id),
        }
    }

    /// Input for a node: predecessor payloads in ascending node-id order;
    /// a single predecessor passes its payload through; source nodes (and
    /// nodes whose predecessors were all skipped) receive the graph input.
    fn input_for(&self, id: &NodeId) -> Payload {
        let mut preds: Vec<&NodeId> = self
            .predecessors
            .get(id)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .collect();
        preds.sort();
        let payloads: Vec<Payload> = preds
            .iter()
            .filter_map(|p| self.results.get(p).map(|r| r.payload.clone()))
            .collect();
        match payloads.len() {
            0 => self.input.clone(),
            1 => payloads.into_iter().next().expect("one payload"),
            _ => Value::Array(payloads),
        }
    }

    fn on_member_complete(
        &mut self,
        member: usize,
        result: ProcessResult,
        now: Duration,
    ) -> Vec<Directive> {
        let id = self.member_ids[member].clone();
        self.finished.insert(id.clone());
        self.results.insert(id.clone(), result);

        let mut directives = Vec::new();
        if self.batch_open && self.batch.contains(&id) {
            self.batch_finished += 1;
            if self.batch_finished >= self.batch_required {
                self.complete_batch(&mut directives);
            }
        } else if self.deferred_branch_sources.remove(&id) {
            // A detached branch source finally has a result; its routing
            // decision can now release or skip the gated targets.
            self.release_edges(&id);
            self.maybe_start_batch(&mut directives);
        }
        directives.extend(self.maybe_finish(now));
        directives
    }

    fn on_timeout(&mut self, epoch: u64, now: Duration) -> (bool, Vec<Directive>) {
        if !self.batch_open || self.batch_epoch != epoch {
            return (false, Vec::new());
        }
        let mut directives = Vec::new();
        self.complete_batch(&mut directives);
        directives.extend(self.maybe_finish(now));
        (true, directives)
    }

    /// The barrier is satisfied (or timed out): release member edges and
    /// open the way for the next batch. Unfinished members are detached —
    /// they keep running and their results are still recorded, but they no
    /// longer gate downstream nodes, except through conditional branches.
    fn complete_batch(&mut self, directives: &mut Vec<Directive>) {
        self.batch_open = false;
        let members: Vec<NodeId> = self.batch.iter().cloned().collect();
        for m in &members {
            if !self.finished.contains(m) && self.branch_for(m).is_some() {
                self.deferred_branch_sources.insert(m.clone());
                continue;
            }
            self.release_edges(m);
        }
        self.maybe_start_batch(directives);
    }

    fn branch_for(&self, id: &NodeId) -> Option<&ConditionalBranch> {
        self.branches.iter().find(|b| &b.source == id)
    }

    /// Release every outgoing edge of `m`, honoring its branch if declared.
    fn release_edges(&mut self, m: &NodeId) {
        let successors = self.successors.get(m).cloned().unwrap_or_default();
        let mut gated: BTreeSet<NodeId> = BTreeSet::new();
        let mut selected: BTreeSet<NodeId> = BTreeSet::new();
        if let Some(branch) = self.branch_for(m) {
            gated = branch.all_targets().cloned().collect();
            if let Some(result) = self.results.get(m) {
                if let Some(targets) = branch.select(result) {
                    selected = targets.iter().cloned().collect();
                }
            }
        }
        for s in successors {
            let real = !gated.contains(&s) || selected.contains(&s);
            self.release_edge(&s, real);
        }
    }

    fn release_edge(&mut self, s: &NodeId, real: bool) {
        let remaining = {
            let d = self
                .in_degree
                .get_mut(s)
                .expect("edges validated at build");
            *d -= 1;
            *d
        };
        if real {
            *self.real_contribs.entry(s.clone()).or_default() += 1;
        }
        if remaining == 0 {
            if self.real_contribs.get(s).copied().unwrap_or(0) > 0 {
                self.ready_pending.insert(s.clone());
            } else {
                self.skip_node(s);
            }
        }
    }

    /// Every activation path was deselected: the node never runs, and the
    /// skip cascades to successors that have no other live path.
    fn skip_node(&mut self, s: &NodeId) {
        self.skipped.insert(s.clone());
        let successors = self.successors.get(s).cloned().unwrap_or_default();
        for t in successors {
            self.release_edge(&t, false);
        }
    }

    fn maybe_start_batch(&mut self, directives: &mut Vec<Directive>) {
        if self.batch_open || self.ready_pending.is_empty() {
            return;
        }
        let ready = std::mem::take(&mut self.ready_pending);
        directives.extend(self.start_batch(ready));
    }

    fn maybe_finish(&mut self, now: Duration) -> Vec<Directive> {
        if self.done
            || self.batch_open
            || !self.ready_pending.is_empty()
            || self.activated.len() != self.finished.len()
        {
            return Vec::new();
        }
        self.finish(now)
    }

    fn finish(&mut self, now: Duration) -> Vec<Directive> {
        self.done = true;
        let success = self.results.values().all(|r| r.success);
        // Aggregate payload: structural sink nodes that produced a result.
        let mut payload = Map::new();
        for id in self.nodes.keys() {
            let is_sink = self.successors.get(id).map_or(true, Vec::is_empty);
            if is_sink {
                if let Some(r) = self.results.get(id) {
                    payload.insert(id.as_str().to_string(), r.payload.clone());
                }
            }
        }
        let error = self
            .results
            .values()
            .find_map(|r| r.error.clone());
        let result = ProcessResult {
            process_id: ProcessId::new(format!("workflow#{}", self.id)),
            name: self.name.clone(),
            success,
            payload: Value::Object(payload),
            started_at: self.started_at,
            finished_at: now,
            error,
        };
        let mut directives = Vec::new();
        if !self.skipped.is_empty() {
            directives.push(Directive::RecordSkipped {
                nodes: self.skipped.iter().cloned().collect(),
            });
        }
        directives.push(Directive::Emit {
            from: self.id,
            parent: self.parent,
            result,
        });
        directives
    }
}
