//! Core abstractions for the shopfloor engine.
//!
//! Every process is a synchronous, deterministic state machine: it receives
//! an [`Event`], mutates its own state, and returns [`Action`]s for the
//! runner to execute. All I/O — resource acquisition, timers, output
//! production — happens in the runner, never inside a state machine.

mod action;
mod behavior;
mod event;
mod process;
mod traits;

pub use action::{Action, OutputSpec};
pub use behavior::{ErrorProne, FailureProne, FixedDelay};
pub use event::{Event, RequirementCheck};
pub use process::{ProcessBuilder, ProcessSpec, ProcessState, ProcessStateMachine};
pub use traits::{BehaviorStatus, Precondition, ResultObserver, StateMachine, WorkBehavior};
