//! Process specification and its state machine.

use crate::{Action, Event, OutputSpec, Precondition, StateMachine, WorkBehavior};
use serde_json::Value;
use shopfloor_types::{Payload, Priority, ProcessId, ProcessResult, ResourceRequirement};
use std::fmt;
use std::time::Duration;

/// Execution states of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Constructed, not yet started.
    Created,
    /// Checking preconditions and requirement satisfiability.
    Validating,
    /// Waiting for resource grants.
    BlockedOnResources,
    /// Work body in progress.
    Running,
    /// Emitting outputs.
    Producing,
    /// Finished successfully.
    Completed,
    /// Finished with a validation failure or body fault.
    Failed,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::Created => "created",
            ProcessState::Validating => "validating",
            ProcessState::BlockedOnResources => "blocked_on_resources",
            ProcessState::Running => "running",
            ProcessState::Producing => "producing",
            ProcessState::Completed => "completed",
            ProcessState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Static description of one unit of work: identity, priority, resource
/// contract, duration, and optional behaviors and preconditions.
pub struct ProcessSpec {
    /// Unique identifier.
    pub id: ProcessId,
    /// Human-readable name.
    pub name: String,
    /// Scheduling priority (1..=10, lower is more urgent).
    pub priority: Priority,
    /// Base duration of the work body.
    pub duration: Duration,
    /// Declarative resource requirements.
    pub requirements: Vec<ResourceRequirement>,
    /// Outputs produced on success.
    pub outputs: Vec<OutputSpec>,
    /// Predicates over the input, checked during validation.
    pub(crate) preconditions: Vec<Precondition>,
    /// Domain behaviors folded over the base duration.
    pub behaviors: Vec<Box<dyn WorkBehavior>>,
    /// Payload emitted on success; input passes through when absent.
    pub output_payload: Option<Payload>,
}

impl fmt::Debug for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("duration", &self.duration)
            .field("requirements", &self.requirements)
            .field("outputs", &self.outputs)
            .field("preconditions", &self.preconditions.len())
            .field("behaviors", &self.behaviors.len())
            .finish()
    }
}

impl ProcessSpec {
    /// Start building a process specification.
    pub fn builder(id: impl Into<ProcessId>, name: impl Into<String>) -> ProcessBuilder {
        ProcessBuilder::new(id, name)
    }
}

/// Builder for [`ProcessSpec`].
pub struct ProcessBuilder {
    spec: ProcessSpec,
}

impl ProcessBuilder {
    fn new(id: impl Into<ProcessId>, name: impl Into<String>) -> Self {
        Self {
            spec: ProcessSpec {
                id: id.into(),
                name: name.into(),
                priority: Priority::DEFAULT,
                duration: Duration::from_secs(1),
                requirements: Vec::new(),
                outputs: Vec::new(),
                preconditions: Vec::new(),
                behaviors: Vec::new(),
                output_payload: None,
            },
        }
    }

    /// Set the scheduling priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.spec.priority = priority;
        self
    }

    /// Set the base duration of the work body.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.spec.duration = duration;
        self
    }

    /// Declare a resource requirement.
    pub fn requires(mut self, requirement: ResourceRequirement) -> Self {
        self.spec.requirements.push(requirement);
        self
    }

    /// Declare an output produced on success.
    pub fn produces(mut self, output: OutputSpec) -> Self {
        self.spec.outputs.push(output);
        self
    }

    /// Add an execution precondition over the input payload.
    pub fn precondition(mut self, pred: impl Fn(&Payload) -> bool + Send + 'static) -> Self {
        self.spec.preconditions.push(Box::new(pred));
        self
    }

    /// Attach a domain behavior (machine, worker, transport, ...).
    pub fn behavior(mut self, behavior: impl WorkBehavior + 'static) -> Self {
        self.spec.behaviors.push(Box::new(behavior));
        self
    }

    /// Emit this payload on success instead of passing the input through.
    pub fn output_payload(mut self, payload: Payload) -> Self {
        self.spec.output_payload = Some(payload);
        self
    }

    /// Finish building.
    pub fn build(self) -> ProcessSpec {
        self.spec
    }
}

/// State machine driving one process execution.
///
/// Lifecycle: `Created → Validating → BlockedOnResources → Running →
/// Producing → Completed`, short-circuiting to `Failed` on a validation
/// failure or body fault. Each arrow is a potential suspension point; the
/// runner resumes the machine by delivering the next [`Event`].
pub struct ProcessStateMachine {
    spec: ProcessSpec,
    state: ProcessState,
    now: Duration,
    started_at: Duration,
    input: Payload,
}

impl ProcessStateMachine {
    /// Wrap a spec into a fresh, not-yet-started machine.
    pub fn new(spec: ProcessSpec) -> Self {
        Self {
            spec,
            state: ProcessState::Created,
            now: Duration::ZERO,
            started_at: Duration::ZERO,
            input: Value::Null,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// The wrapped specification.
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    /// Mutable access to the specification (the runner drives behaviors).
    pub fn spec_mut(&mut self) -> &mut ProcessSpec {
        &mut self.spec
    }

    fn fail(&mut self, error: String) -> Vec<Action> {
        self.state = ProcessState::Failed;
        vec![Action::EmitResult {
            result: ProcessResult::failure(
                self.spec.id.clone(),
                self.spec.name.clone(),
                self.input.clone(),
                self.started_at,
                self.now,
                error,
            ),
        }]
    }

    fn on_start(&mut self, input: Payload, requirements: Vec<crate::RequirementCheck>) -> Vec<Action> {
        self.state = ProcessState::Validating;
        self.started_at = self.now;
        self.input = input;

        let failed_precondition = self
            .spec
            .preconditions
            .iter()
            .position(|pred| !pred(&self.input));
        if let Some(idx) = failed_precondition {
            return self.fail(format!("precondition {idx} not satisfied"));
        }

        let missing: Vec<String> = requirements
            .iter()
            .filter(|check| check.requirement.mandatory && !check.satisfiable)
            .map(|check| check.requirement.to_string())
            .collect();
        if !missing.is_empty() {
            return self.fail(format!(
                "mandatory requirement unsatisfiable: {}",
                missing.join(", ")
            ));
        }

        self.state = ProcessState::BlockedOnResources;
        vec![Action::AcquireResources {
            requests: self.spec.requirements.clone(),
        }]
    }

    fn on_granted(&mut self) -> Vec<Action> {
        self.state = ProcessState::Running;
        vec![Action::RunBody {
            base: self.spec.duration,
        }]
    }

    fn on_body_complete(&mut self, fault: Option<String>) -> Vec<Action> {
        if let Some(fault) = fault {
            let mut actions = vec![Action::ReleaseResources];
            actions.extend(self.fail(fault));
            return actions;
        }

        self.state = ProcessState::Producing;
        let payload = self
            .spec
            .output_payload
            .clone()
            .unwrap_or_else(|| self.input.clone());
        let result = ProcessResult::success(
            self.spec.id.clone(),
            self.spec.name.clone(),
            payload,
            self.started_at,
            self.now,
        );
        self.state = ProcessState::Completed;
        vec![
            Action::ProduceOutputs {
                outputs: self.spec.outputs.clone(),
            },
            Action::ReleaseResources,
            Action::EmitResult { result },
        ]
    }
}

impl StateMachine for ProcessStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match (self.state, event) {
            (ProcessState::Created, Event::Start { input, requirements }) => {
                self.on_start(input, requirements)
            }
            (ProcessState::BlockedOnResources, Event::ResourcesGranted) => self.on_granted(),
            (ProcessState::Running, Event::BodyComplete { fault }) => self.on_body_complete(fault),
            // Anything else is a stale or duplicate delivery; ignore it.
            _ => Vec::new(),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}
