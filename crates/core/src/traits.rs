//! Core traits: state machines, work behaviors, result observers.

use crate::{Action, Event};
use rand::RngCore;
use shopfloor_types::{Payload, ProcessResult};
use std::time::Duration;

/// Predicate over the input payload, checked during validation.
pub type Precondition = Box<dyn Fn(&Payload) -> bool + Send>;

/// A state machine that processes events.
///
/// This is the core abstraction of the engine. All scheduling-relevant
/// logic is implemented as state machines that are:
///
/// - **Synchronous**: no async, no blocking
/// - **Deterministic**: same state + event = same actions
/// - **Pure-ish**: mutates self, but performs no I/O
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// The returned actions are executed by the runner: acquiring resources,
    /// scheduling work completion, producing outputs, emitting results.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current virtual time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: Duration);

    /// Get the time last set via `set_time()`.
    fn now(&self) -> Duration;
}

/// Capability interface for domain resource behaviors (machine wear,
/// worker fatigue, transport variability).
///
/// The engine invokes behaviors as opaque bodies during the run step of a
/// process and never inspects their internals. The base duration is folded
/// through every behavior attached to the process; an `Err` is recorded as
/// the process's fault without aborting sibling processes.
pub trait WorkBehavior: Send {
    /// Stretch (or keep) the base duration for one operation.
    ///
    /// Randomness must come from `rng`, which the engine seeds, so that
    /// identical seeds reproduce identical runs.
    fn operate(&mut self, base: Duration, rng: &mut dyn RngCore) -> Result<Duration, String>;

    /// Snapshot of this behavior's activity for reporting collaborators.
    fn status(&self) -> BehaviorStatus;
}

/// Reporting snapshot of a [`WorkBehavior`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorStatus {
    /// Operations performed.
    pub operations: u64,
    /// Failures / errors injected.
    pub failures: u64,
}

/// Push-based subscriber for process results.
///
/// Registered on the runner; invoked at the moment each result is emitted.
pub trait ResultObserver: Send {
    /// Called for every emitted result, task-level and aggregate.
    fn on_result(&mut self, result: &ProcessResult);
}
