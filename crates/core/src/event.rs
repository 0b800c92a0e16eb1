//! Events delivered to process state machines.

use shopfloor_types::{Payload, ResourceRequirement};

/// Satisfiability report for one declared requirement, computed by the
/// runner against the registered pools at start time.
#[derive(Debug, Clone)]
pub struct RequirementCheck {
    /// The declared requirement.
    pub requirement: ResourceRequirement,
    /// Whether a matching pool exists and could ever satisfy it.
    pub satisfiable: bool,
}

/// Events a process state machine can receive.
///
/// The runner delivers these in deterministic virtual-time order.
#[derive(Debug)]
pub enum Event {
    /// Begin execution with the given input.
    ///
    /// Carries the runner's satisfiability report so validation needs no
    /// pool access of its own.
    Start {
        input: Payload,
        requirements: Vec<RequirementCheck>,
    },

    /// Every requested resource has been granted.
    ResourcesGranted,

    /// The work body finished; `fault` carries a caught body failure.
    BodyComplete { fault: Option<String> },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Start { .. } => "Start",
            Event::ResourcesGranted => "ResourcesGranted",
            Event::BodyComplete { .. } => "BodyComplete",
        }
    }
}
