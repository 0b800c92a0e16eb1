//! Deterministic simulation runner.
//!
//! The runner owns the virtual clock, the event queue, every resource pool,
//! and every live process/composite state machine. State machines express
//! all I/O as actions; the runner executes those actions inline and feeds
//! the consequences back as future events, so the whole simulation is one
//! single-threaded, reproducible loop.

use crate::composite::{
    ChainState, CompositeState, Directive, GraphState, GroupState, ParentLink,
};
use crate::event_queue::EventKey;
use crate::pool::ResourcePool;
use crate::{CompositeId, InstanceId};
use indexmap::IndexMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shopfloor_core::{
    Action, Event, OutputSpec, ProcessSpec, ProcessStateMachine, RequirementCheck, ResultObserver,
    StateMachine,
};
use shopfloor_flow::{FlowError, FlowNode, ProcessChain, ProcessGroup};
use shopfloor_types::{
    Payload, PoolId, Priority, ProcessResult, ResourceKind, ResourceRequirement, SubmissionId,
};
use shopfloor_workflow::{NodeId, SyncPolicy, WorkflowGraph};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Random seed for probabilistic behaviors.
    pub seed: u64,
    /// Barrier policy for ready batches without a declared
    /// synchronization point.
    pub default_sync_policy: SyncPolicy,
    /// Wait bound for batches without a declared synchronization point.
    pub default_sync_timeout: Option<Duration>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            default_sync_policy: SyncPolicy::AllComplete,
            default_sync_timeout: None,
        }
    }
}

impl SimulationConfig {
    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the barrier policy for batches without a declared point.
    pub fn with_default_sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.default_sync_policy = policy;
        self
    }

    /// Bound the wait of batches without a declared point.
    pub fn with_default_sync_timeout(mut self, timeout: Duration) -> Self {
        self.default_sync_timeout = Some(timeout);
        self
    }
}

/// Events the runner schedules for itself.
enum SimEvent {
    /// Start a top-level submission.
    SpawnRoot {
        node: RootNode,
        parent: ParentLink,
        input: Payload,
    },
    /// Deliver `Start` to a process (requirement checks are computed at
    /// delivery time, against the pools as they are then).
    ProcessStart {
        instance: InstanceId,
        input: Payload,
    },
    /// Deliver `ResourcesGranted` to a process.
    ResourcesGranted { instance: InstanceId },
    /// Deliver `BodyComplete` to a process.
    BodyComplete {
        instance: InstanceId,
        fault: Option<String>,
    },
    /// A synchronization barrier's timeout elapsed.
    SyncTimeout { composite: CompositeId, epoch: u64 },
}

enum RootNode {
    Flow(FlowNode),
    Graph(WorkflowGraph),
}

/// One live process execution.
struct Instance {
    machine: ProcessStateMachine,
    parent: ParentLink,
    /// Slot leases to give back after the body (quantity grants are
    /// consumed permanently).
    holds: Vec<(PoolId, f64)>,
    /// Requirements waiting for a grant.
    pending: Vec<ResourceRequirement>,
}

/// Unit of work for the synchronous drive loop.
enum WorkItem {
    Directive(Directive),
    Bubble {
        parent: ParentLink,
        result: ProcessResult,
    },
}

/// Statistics collected during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Work-body timers scheduled.
    pub work_timers_set: u64,
    /// Resource grants issued.
    pub grants_issued: u64,
    /// Resource requests that entered the wait queue.
    pub requests_queued: u64,
    /// Synchronization barriers that proceeded on timeout.
    pub sync_timeouts: u64,
    /// Results recorded (task-level and aggregate).
    pub results_recorded: u64,
    /// Failed results among those recorded.
    pub failures_recorded: u64,
}

impl SimulationStats {
    /// Fraction of recorded results that succeeded.
    pub fn success_rate(&self) -> f64 {
        if self.results_recorded == 0 {
            1.0
        } else {
            (self.results_recorded - self.failures_recorded) as f64 / self.results_recorded as f64
        }
    }
}

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions. Given the
/// same seed and the same scenario, produces identical results every run.
pub struct SimulationRunner {
    config: SimulationConfig,
    /// Current simulation time.
    now: Duration,
    /// Sequence counter for deterministic ordering.
    sequence: u64,
    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, SimEvent>,
    /// Registered pools, in registration order.
    pools: IndexMap<PoolId, ResourcePool>,
    /// Live process executions.
    instances: BTreeMap<InstanceId, Instance>,
    /// Live composition nodes.
    composites: BTreeMap<CompositeId, CompositeState>,
    /// Processes waiting for resources, keyed by (priority, arrival).
    waiters: BTreeMap<(Priority, u64), InstanceId>,
    next_instance: InstanceId,
    next_composite: CompositeId,
    next_submission: u64,
    /// RNG for probabilistic behaviors (seeded for determinism).
    rng: ChaCha8Rng,
    stats: SimulationStats,
    /// Every emitted result, in emission order.
    results: Vec<ProcessResult>,
    /// Aggregate outcome per submission.
    outcomes: BTreeMap<SubmissionId, ProcessResult>,
    /// Workflow nodes deselected by branch routing.
    skipped: Vec<NodeId>,
    observers: Vec<Box<dyn ResultObserver>>,
}

impl SimulationRunner {
    /// Create a runner with a deterministic seed and default configuration.
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimulationConfig::default().with_seed(seed))
    }

    /// Create a runner from a full configuration.
    pub fn with_config(config: SimulationConfig) -> Self {
        info!(seed = config.seed, "created simulation runner");
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            now: Duration::ZERO,
            sequence: 0,
            event_queue: BTreeMap::new(),
            pools: IndexMap::new(),
            instances: BTreeMap::new(),
            composites: BTreeMap::new(),
            waiters: BTreeMap::new(),
            next_instance: 0,
            next_composite: 0,
            next_submission: 0,
            rng,
            stats: SimulationStats::default(),
            results: Vec::new(),
            outcomes: BTreeMap::new(),
            skipped: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Register a resource pool.
    pub fn register_pool(&mut self, pool: ResourcePool) {
        info!(pool = %pool.id(), kind = %pool.kind(), "registered resource pool");
        self.pools.insert(pool.id().clone(), pool);
    }

    /// Subscribe a push-based result observer.
    pub fn subscribe(&mut self, observer: Box<dyn ResultObserver>) {
        self.observers.push(observer);
    }

    /// Submit a single process, starting after `delay`.
    pub fn submit_process(
        &mut self,
        spec: ProcessSpec,
        input: Payload,
        delay: Duration,
    ) -> SubmissionId {
        self.submit_root(RootNode::Flow(FlowNode::Process(spec)), input, delay)
    }

    /// Submit a chain, starting after `delay`.
    ///
    /// Fails when an embedded group has an invalid rank mapping.
    pub fn submit_chain(
        &mut self,
        chain: ProcessChain,
        input: Payload,
        delay: Duration,
    ) -> Result<SubmissionId, FlowError> {
        for node in chain.nodes() {
            validate_node(node)?;
        }
        Ok(self.submit_root(RootNode::Flow(FlowNode::Chain(chain)), input, delay))
    }

    /// Submit a group, starting after `delay`.
    ///
    /// Fails when the rank mapping is partial or not onto `1..=N`.
    pub fn submit_group(
        &mut self,
        group: ProcessGroup,
        input: Payload,
        delay: Duration,
    ) -> Result<SubmissionId, FlowError> {
        let node = FlowNode::Group(group);
        validate_node(&node)?;
        Ok(self.submit_root(RootNode::Flow(node), input, delay))
    }

    /// Submit a workflow graph, starting after `delay`.
    ///
    /// Graphs are validated when built, so submission cannot fail.
    pub fn submit_graph(
        &mut self,
        graph: WorkflowGraph,
        input: Payload,
        delay: Duration,
    ) -> SubmissionId {
        self.submit_root(RootNode::Graph(graph), input, delay)
    }

    fn submit_root(&mut self, node: RootNode, input: Payload, delay: Duration) -> SubmissionId {
        let submission = SubmissionId(self.next_submission);
        self.next_submission += 1;
        let priority = match &node {
            RootNode::Flow(FlowNode::Process(spec)) => spec.priority,
            _ => Priority::DEFAULT,
        };
        debug!(%submission, delay_secs = delay.as_secs_f64(), "submission scheduled");
        self.schedule(
            self.now + delay,
            priority,
            SimEvent::SpawnRoot {
                node,
                parent: ParentLink::Submission(submission),
                input,
            },
        );
        submission
    }

    /// Run the simulation until the time limit.
    ///
    /// The exit condition is time exhaustion, not event exhaustion: the
    /// clock always advances to `end_time` even when the queue drains
    /// early, so polling patterns like
    /// `while runner.now() < deadline { runner.run_until(..) }` terminate.
    pub fn run_until(&mut self, end_time: Duration) {
        trace!(end_time_secs = end_time.as_secs_f64(), "running simulation");

        while let Some((&key, _)) = self.event_queue.first_key_value() {
            if key.time > end_time {
                debug!(
                    remaining_events = self.event_queue.len(),
                    "time limit reached"
                );
                break;
            }

            let (key, event) = self
                .event_queue
                .pop_first()
                .expect("peeked entry is still first");
            self.now = key.time;
            self.stats.events_processed += 1;
            self.dispatch(event);
        }

        if self.now < end_time {
            self.now = end_time;
        }

        trace!(
            events_processed = self.stats.events_processed,
            final_time = ?self.now,
            "simulation step complete"
        );
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Run statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Every emitted result, in emission order.
    pub fn results(&self) -> &[ProcessResult] {
        &self.results
    }

    /// The aggregate outcome of a submission, once it finished.
    pub fn outcome(&self, submission: SubmissionId) -> Option<&ProcessResult> {
        self.outcomes.get(&submission)
    }

    /// Workflow nodes that were deselected by branch routing.
    pub fn skipped_nodes(&self) -> &[NodeId] {
        &self.skipped
    }

    /// Look up a pool by id.
    pub fn pool(&self, id: &str) -> Option<&ResourcePool> {
        self.pools.get(&PoolId::new(id))
    }

    /// Registered pools in registration order.
    pub fn pools(&self) -> impl Iterator<Item = &ResourcePool> {
        self.pools.values()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Event dispatch
    // ═══════════════════════════════════════════════════════════════════

    fn schedule(&mut self, time: Duration, priority: Priority, event: SimEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, priority, self.sequence);
        self.event_queue.insert(key, event);
        key
    }

    fn dispatch(&mut self, event: SimEvent) {
        match event {
            SimEvent::SpawnRoot {
                node,
                parent,
                input,
            } => {
                let directives = match node {
                    RootNode::Flow(node) => self.spawn_flow_node(node, parent, input),
                    RootNode::Graph(graph) => self.spawn_graph(graph, parent, input),
                };
                self.drive(directives.into_iter().map(WorkItem::Directive).collect());
            }

            SimEvent::ProcessStart { instance, input } => {
                let Some(inst) = self.instances.get(&instance) else {
                    return;
                };
                let requirements = inst.machine.spec().requirements.clone();
                let checks: Vec<RequirementCheck> = requirements
                    .into_iter()
                    .map(|requirement| {
                        let satisfiable = self
                            .find_pool(requirement.kind, &requirement.name)
                            .map(|pid| self.pools[&pid].can_ever_satisfy(requirement.amount))
                            .unwrap_or(false);
                        if !satisfiable && !requirement.mandatory {
                            warn!(
                                requirement = %requirement,
                                "optional requirement unsatisfiable, continuing without it"
                            );
                        }
                        RequirementCheck {
                            requirement,
                            satisfiable,
                        }
                    })
                    .collect();
                self.deliver(
                    instance,
                    Event::Start {
                        input,
                        requirements: checks,
                    },
                );
            }

            SimEvent::ResourcesGranted { instance } => {
                self.deliver(instance, Event::ResourcesGranted);
            }

            SimEvent::BodyComplete { instance, fault } => {
                self.deliver(instance, Event::BodyComplete { fault });
            }

            SimEvent::SyncTimeout { composite, epoch } => {
                let Some(comp) = self.composites.get_mut(&composite) else {
                    return;
                };
                let (fired, directives) = comp.on_timeout(epoch, self.now);
                if fired {
                    self.stats.sync_timeouts += 1;
                    warn!(
                        composite,
                        epoch, "synchronization timeout, proceeding with partial results"
                    );
                }
                self.drive(directives.into_iter().map(WorkItem::Directive).collect());
            }
        }
    }

    /// Deliver one event to a process state machine and execute the actions.
    fn deliver(&mut self, instance: InstanceId, event: Event) {
        let Some(inst) = self.instances.get_mut(&instance) else {
            return;
        };
        trace!(instance, event = event.type_name(), "delivering event");
        inst.machine.set_time(self.now);
        let actions = inst.machine.handle(event);
        self.process_actions(instance, actions);
    }

    fn process_actions(&mut self, instance: InstanceId, actions: Vec<Action>) {
        for action in actions {
            trace!(instance, action = action.type_name(), "processing action");
            match action {
                Action::AcquireResources { requests } => self.on_acquire(instance, requests),
                Action::RunBody { base } => self.on_run_body(instance, base),
                Action::ProduceOutputs { outputs } => self.on_produce(outputs),
                Action::ReleaseResources => self.on_release(instance),
                Action::EmitResult { result } => self.on_emit(instance, result),
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Resource arbitration
    // ═══════════════════════════════════════════════════════════════════

    fn find_pool(&self, kind: ResourceKind, name: &str) -> Option<PoolId> {
        self.pools
            .values()
            .find(|p| p.kind() == kind && p.name() == name)
            .map(|p| p.id().clone())
    }

    fn on_acquire(&mut self, instance: InstanceId, requests: Vec<ResourceRequirement>) {
        // Optional requirements whose pool is missing are dropped here;
        // mandatory ones already failed validation.
        let pending: Vec<ResourceRequirement> = requests
            .into_iter()
            .filter(|r| self.find_pool(r.kind, &r.name).is_some())
            .collect();
        let Some(inst) = self.instances.get_mut(&instance) else {
            return;
        };
        let priority = inst.machine.spec().priority;
        inst.pending = pending;
        self.sequence += 1;
        self.waiters.insert((priority, self.sequence), instance);
        self.stats.requests_queued += 1;
        self.drain_waiters();
    }

    /// Grant waiting requests in (priority, arrival) order.
    ///
    /// Grants are all-or-nothing across a process's requirements, so a
    /// process never holds one pool while blocking on another (no deadlock
    /// through partial holds). A waiter that cannot be satisfied marks all
    /// of its pools blocked, which keeps later arrivals from overtaking it
    /// on any of them (no starvation at equal priority).
    fn drain_waiters(&mut self) {
        let keys: Vec<(Priority, u64)> = self.waiters.keys().copied().collect();
        let mut blocked: BTreeSet<PoolId> = BTreeSet::new();

        for key in keys {
            let Some(&instance) = self.waiters.get(&key) else {
                continue;
            };
            let Some(inst) = self.instances.get(&instance) else {
                self.waiters.remove(&key);
                continue;
            };
            let requests = inst.pending.clone();

            let mut resolved: Vec<(PoolId, f64, bool)> = Vec::new();
            let mut pool_ids: Vec<PoolId> = Vec::new();
            let mut grantable = true;
            let mut contends_with_blocked = false;
            for r in &requests {
                let Some(pid) = self.find_pool(r.kind, &r.name) else {
                    continue;
                };
                if blocked.contains(&pid) {
                    contends_with_blocked = true;
                    break;
                }
                let pool = &self.pools[&pid];
                if !pool.can_satisfy_now(r.amount) {
                    grantable = false;
                }
                resolved.push((pid.clone(), r.amount, pool.is_slot_pool()));
                pool_ids.push(pid);
            }
            if contends_with_blocked {
                continue;
            }
            if !grantable {
                // Reserve this waiter's place on every pool it touches.
                blocked.extend(pool_ids);
                continue;
            }

            for (pid, amount, _) in &resolved {
                let pool = self.pools.get_mut(pid).expect("pool resolved above");
                pool.consume(*amount).expect("availability checked above");
            }
            let inst = self.instances.get_mut(&instance).expect("checked above");
            for (pid, amount, is_slot) in resolved {
                if is_slot {
                    inst.holds.push((pid, amount));
                }
            }
            inst.pending.clear();
            let priority = inst.machine.spec().priority;
            self.waiters.remove(&key);
            self.stats.grants_issued += 1;
            trace!(instance, "resources granted");
            self.schedule(self.now, priority, SimEvent::ResourcesGranted { instance });
        }
    }

    fn on_run_body(&mut self, instance: InstanceId, base: Duration) {
        let Some(inst) = self.instances.get_mut(&instance) else {
            return;
        };
        let mut duration = base;
        let mut fault = None;
        for behavior in inst.machine.spec_mut().behaviors.iter_mut() {
            match behavior.operate(duration, &mut self.rng) {
                Ok(d) => duration = d,
                Err(e) => {
                    fault = Some(e);
                    break;
                }
            }
        }
        let priority = inst.machine.spec().priority;
        // A fault aborts the body immediately; otherwise the process
        // suspends for the behavior-adjusted duration.
        let delay = if fault.is_some() {
            Duration::ZERO
        } else {
            duration
        };
        self.stats.work_timers_set += 1;
        self.schedule(
            self.now + delay,
            priority,
            SimEvent::BodyComplete { instance, fault },
        );
    }

    fn on_produce(&mut self, outputs: Vec<OutputSpec>) {
        let mut produced_any = false;
        for output in outputs {
            match self.find_pool(output.kind, &output.name) {
                Some(pid) => {
                    let pool = self.pools.get_mut(&pid).expect("pool resolved above");
                    if let Err(e) = pool.produce(output.amount) {
                        warn!(pool = %pid, error = %e, "output production failed");
                    } else {
                        produced_any = true;
                    }
                }
                None => {
                    let pid = PoolId::new(output.name.clone());
                    if self.pools.contains_key(&pid) {
                        warn!(
                            pool = %pid,
                            "output name collides with a pool of a different kind"
                        );
                        continue;
                    }
                    info!(pool = %pid, amount = output.amount, "created output pool");
                    self.pools.insert(
                        pid.clone(),
                        ResourcePool::quantity(
                            pid,
                            output.name,
                            output.kind,
                            output.amount,
                            output.unit,
                        ),
                    );
                    produced_any = true;
                }
            }
        }
        if produced_any {
            self.drain_waiters();
        }
    }

    fn on_release(&mut self, instance: InstanceId) {
        let Some(inst) = self.instances.get_mut(&instance) else {
            return;
        };
        let holds = std::mem::take(&mut inst.holds);
        if holds.is_empty() {
            return;
        }
        for (pid, amount) in holds {
            match self.pools.get_mut(&pid) {
                Some(pool) => {
                    if let Err(e) = pool.produce(amount) {
                        warn!(pool = %pid, error = %e, "slot release failed");
                    }
                }
                None => warn!(pool = %pid, "held pool disappeared before release"),
            }
        }
        self.drain_waiters();
    }

    // ═══════════════════════════════════════════════════════════════════
    // Results and composition
    // ═══════════════════════════════════════════════════════════════════

    fn on_emit(&mut self, instance: InstanceId, result: ProcessResult) {
        let Some(inst) = self.instances.remove(&instance) else {
            return;
        };
        self.waiters.retain(|_, &mut waiting| waiting != instance);
        self.record_result(&result);
        self.drive(VecDeque::from([WorkItem::Bubble {
            parent: inst.parent,
            result,
        }]));
    }

    fn record_result(&mut self, result: &ProcessResult) {
        debug!(
            process = %result.process_id,
            success = result.success,
            finished_at = ?result.finished_at,
            "result recorded"
        );
        self.stats.results_recorded += 1;
        if !result.success {
            self.stats.failures_recorded += 1;
        }
        for observer in &mut self.observers {
            observer.on_result(result);
        }
        self.results.push(result.clone());
    }

    /// Synchronous work loop for composite directives and completion
    /// bubbling. Keeps recursion out of deeply nested compositions.
    fn drive(&mut self, mut queue: VecDeque<WorkItem>) {
        while let Some(item) = queue.pop_front() {
            match item {
                WorkItem::Bubble { parent, result } => match parent {
                    ParentLink::Submission(submission) => {
                        debug!(%submission, success = result.success, "submission finished");
                        self.outcomes.insert(submission, result);
                    }
                    ParentLink::Member { composite, member } => {
                        if let Some(comp) = self.composites.get_mut(&composite) {
                            let directives = comp.on_member_complete(member, result, self.now);
                            queue.extend(directives.into_iter().map(WorkItem::Directive));
                        }
                    }
                },
                WorkItem::Directive(directive) => match directive {
                    Directive::Spawn {
                        node,
                        parent,
                        input,
                    } => {
                        let directives = self.spawn_flow_node(node, parent, input);
                        queue.extend(directives.into_iter().map(WorkItem::Directive));
                    }
                    Directive::ScheduleTimeout {
                        composite,
                        epoch,
                        delay,
                    } => {
                        // Least-urgent priority, so completions of more
                        // urgent work landing on the same instant are
                        // processed before the timeout.
                        self.schedule(
                            self.now + delay,
                            Priority::MAX,
                            SimEvent::SyncTimeout { composite, epoch },
                        );
                    }
                    Directive::Emit {
                        from,
                        parent,
                        result,
                    } => {
                        self.composites.remove(&from);
                        self.record_result(&result);
                        queue.push_back(WorkItem::Bubble { parent, result });
                    }
                    Directive::RecordSkipped { nodes } => {
                        for node in &nodes {
                            debug!(node = %node, "workflow node skipped by branch routing");
                        }
                        self.skipped.extend(nodes);
                    }
                },
            }
        }
    }

    fn spawn_flow_node(
        &mut self,
        node: FlowNode,
        parent: ParentLink,
        input: Payload,
    ) -> Vec<Directive> {
        match node {
            FlowNode::Process(spec) => {
                let instance = self.next_instance;
                self.next_instance += 1;
                let priority = spec.priority;
                trace!(instance, process = %spec.id, "spawning process");
                self.instances.insert(
                    instance,
                    Instance {
                        machine: ProcessStateMachine::new(spec),
                        parent,
                        holds: Vec::new(),
                        pending: Vec::new(),
                    },
                );
                self.schedule(
                    self.now,
                    priority,
                    SimEvent::ProcessStart { instance, input },
                );
                Vec::new()
            }
            FlowNode::Chain(chain) => {
                let id = self.alloc_composite();
                let mut state = ChainState::new(id, parent, chain, self.now);
                let directives = state.start(input, self.now);
                self.composites.insert(id, CompositeState::Chain(state));
                directives
            }
            FlowNode::Group(group) => {
                let id = self.alloc_composite();
                let mut state = GroupState::new(id, parent, group, input, self.now);
                let directives = state.start(self.now);
                self.composites.insert(id, CompositeState::Group(state));
                directives
            }
        }
    }

    fn spawn_graph(
        &mut self,
        graph: WorkflowGraph,
        parent: ParentLink,
        input: Payload,
    ) -> Vec<Directive> {
        let id = self.alloc_composite();
        let defaults = (
            self.config.default_sync_policy,
            self.config.default_sync_timeout,
        );
        let mut state = GraphState::new(id, parent, "workflow", graph, input, self.now, defaults);
        let directives = state.start(self.now);
        self.composites.insert(id, CompositeState::Graph(state));
        directives
    }

    fn alloc_composite(&mut self) -> CompositeId {
        let id = self.next_composite;
        self.next_composite += 1;
        id
    }
}

fn validate_node(node: &FlowNode) -> Result<(), FlowError> {
    match node {
        FlowNode::Process(_) => Ok(()),
        FlowNode::Chain(chain) => chain.nodes().iter().try_for_each(validate_node),
        FlowNode::Group(group) => {
            group.validate()?;
            group.members().iter().try_for_each(validate_node)
        }
    }
}
